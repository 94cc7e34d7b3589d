use std::env;
use std::str::FromStr;

/// 启动配置
///
/// 进程启动时从环境变量读取一次，之后固定不变；各子系统拿到的是拷贝。
#[derive(Debug, Clone)]
pub struct Config {
    /// 监听端口
    pub port: u16,
    /// 快速匹配房的底分
    pub default_base_score: i32,
    /// 快速匹配房的台分
    pub default_tai_score: i32,
    /// 快速匹配房的局数
    pub default_rounds: u32,
    /// 机器人难度（easy / normal / hard）
    pub bot_difficulty: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            default_base_score: 100,
            default_tai_score: 20,
            default_rounds: 1,
            bot_difficulty: "normal".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("MAHJONG_PORT", defaults.port),
            default_base_score: env_or("MAHJONG_BASE_SCORE", defaults.default_base_score),
            default_tai_score: env_or("MAHJONG_TAI_SCORE", defaults.default_tai_score),
            default_rounds: env_or("MAHJONG_ROUNDS", defaults.default_rounds),
            bot_difficulty: env::var("MAHJONG_BOT_DIFFICULTY").unwrap_or(defaults.bot_difficulty),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
