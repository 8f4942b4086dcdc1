//! HTTP 网关配置

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// 网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// 监听地址
    #[serde(default = "default_bind")]
    pub bind: String,

    /// 站点数据库连接串（sqlx SQLite URL）
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// 会话 Cookie 名称
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// 会话有效期（秒）
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database_url: default_database_url(),
            session_cookie: default_session_cookie(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind.parse()
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite:database/site.db".to_string()
}

fn default_session_cookie() -> String {
    "tenancy_session".to_string()
}

fn default_session_ttl_secs() -> u64 {
    2 * 24 * 3600
}
