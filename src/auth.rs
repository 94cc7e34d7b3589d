use std::fmt;

/// 鉴权结果：令牌对应的用户身份
#[derive(Debug, Clone)]
pub struct Claims {
    pub user_id: u64,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AuthError::MissingToken => "Token required",
            AuthError::InvalidToken => "Invalid token",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for AuthError {}

/// 令牌校验器
///
/// 外部协作方：正式部署接 JWT 服务（签发、续期、第三方登录交换都在
/// 那一侧），游戏层只消费 令牌 → 身份 这一步。
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<Claims, AuthError>;
}

/// 开发用校验器：令牌格式 `<用户号>:<昵称>`
pub struct DevTokenValidator;

impl TokenValidator for DevTokenValidator {
    fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let (id, name) = token.split_once(':').ok_or(AuthError::InvalidToken)?;
        let user_id = id.parse::<u64>().map_err(|_| AuthError::InvalidToken)?;
        if name.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(Claims {
            user_id,
            display_name: name.to_string(),
        })
    }
}
