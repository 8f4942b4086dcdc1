//! 管理员登录令牌配置

use serde::{Deserialize, Serialize};

/// 令牌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// 令牌有效期（秒），默认 24 小时
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// 令牌文件名，位于存储根目录下，所有租户共用
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// 为 true 时拒绝不带域名哈希的令牌
    #[serde(default)]
    pub require_hash: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            file_name: default_file_name(),
            require_hash: false,
        }
    }
}

fn default_ttl_secs() -> u64 {
    86_400
}

fn default_file_name() -> String {
    "tokens.json".to_string()
}
