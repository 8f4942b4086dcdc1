//! 统一配置管理系统
//!
//! 所有配置项的定义、文档、默认值都在这里统一管理。
//! 配置文件使用 TOML 格式。

pub mod gateway;
pub mod host;
pub mod token;

pub use crate::config::gateway::GatewayConfig;
pub use crate::config::host::HostConfig;
pub use crate::config::token::TokenConfig;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

static TABLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("prefix regex is valid"));

/// 租户内核主配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TenancyConfig {
    /// 实例名称
    pub name: String,

    /// 运行环境标识：dev | prod | test
    pub env: String,

    /// 安装级密钥
    ///
    /// 参与域名哈希计算，所有租户共享同一个值。泄露后需要重新签发全部管理入口链接。
    pub install_secret: String,

    /// 宿主站点布局
    #[serde(default)]
    pub host: HostConfig,

    /// 管理员登录令牌
    #[serde(default)]
    pub token: TokenConfig,

    /// HTTP 网关
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// 可观测性配置
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,sqlx=warn"）。默认值 "info"。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标："console"（默认）或 "file"
    #[serde(default = "default_log_output")]
    pub output: String,

    /// output = "file" 时按天轮转
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件目录，output = "file" 时有效
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl ObservabilityConfig {
    /// 检查是否使用控制台日志输出
    pub fn is_console_logging(&self) -> bool {
        self.log.output != "file"
    }

    /// 检查是否应该轮转日志
    pub fn should_rotate_logs(&self) -> bool {
        self.log.output == "file" && self.log.rotate
    }

    /// 获取日志过滤级别，优先使用 RUST_LOG
    pub fn get_filter_level(&self) -> String {
        std::env::var("RUST_LOG")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.filter_level.clone())
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            name: "tenancy-default".to_string(),
            env: "dev".to_string(),
            install_secret: String::new(),
            host: HostConfig::default(),
            token: TokenConfig::default(),
            gateway: GatewayConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl TenancyConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound(path_ref.display().to_string()));
        }

        if !path_ref.is_file() {
            return Err(ConfigError::InvalidFormat(format!(
                "Path is not a valid file: {}",
                path_ref.display()
            )));
        }

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml(&content)?;

        Ok(config)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 验证配置有效性
    ///
    /// 以 "Warning:" 开头的条目为非致命问题，其余均为错误。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        }

        if !["dev", "prod", "test"].contains(&self.env.as_str()) {
            errors.push(format!(
                "Invalid environment '{}', must be one of: dev, prod, test",
                self.env
            ));
        }

        if self.install_secret.trim().is_empty() {
            errors.push("install_secret cannot be empty".to_string());
        } else if self.install_secret.len() < 32 {
            errors.push(
                "Warning: install_secret is short, recommend at least 32 characters".to_string(),
            );
        }

        if !self.host.content_dir.is_absolute() {
            errors.push(format!(
                "host.content_dir must be an absolute path, got '{}'",
                self.host.content_dir.display()
            ));
        }

        match url::Url::parse(&self.host.content_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(format!(
                "host.content_url '{}' must be an http(s) URL",
                self.host.content_url
            )),
        }

        if let Some(ref custom) = self.host.custom_base_path
            && !custom.is_absolute()
        {
            errors.push(format!(
                "host.custom_base_path must be an absolute path, got '{}'",
                custom.display()
            ));
        }

        if !TABLE_PREFIX.is_match(&self.host.default_table_prefix) {
            errors.push(format!(
                "host.default_table_prefix '{}' may only contain letters, digits and underscores",
                self.host.default_table_prefix
            ));
        }

        if self.token.ttl_secs == 0 {
            errors.push("token.ttl_secs must be greater than 0".to_string());
        }

        if self.token.file_name.trim().is_empty() || self.token.file_name.contains('/') {
            errors.push(format!(
                "token.file_name '{}' must be a plain file name",
                self.token.file_name
            ));
        }

        if self.gateway.socket_addr().is_err() {
            errors.push(format!(
                "gateway.bind '{}' is not a valid socket address",
                self.gateway.bind
            ));
        }

        if self.env == "prod" && !self.host.https {
            errors.push("Warning: host.https is disabled in a prod environment".to_string());
        }

        {
            let main_level = self
                .observability
                .filter_level
                .split(',')
                .next()
                .unwrap_or("")
                .trim();
            if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
                errors.push(format!(
                    "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                    self.observability.filter_level
                ));
            }
        }

        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// 从 `validate()` 的结果中分离出致命错误
pub fn fatal_errors(issues: &[String]) -> Vec<&String> {
    issues
        .iter()
        .filter(|issue| !issue.starts_with("Warning:"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn valid_config() -> TenancyConfig {
        TenancyConfig {
            install_secret: "0123456789abcdef0123456789abcdef".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = TenancyConfig::default();
        assert_eq!(config.env, "dev");
        assert_eq!(config.host.legacy_dir_name, "grabwp");
        assert_eq!(config.host.current_dir_name, "grabwp-tenancy");
        assert_eq!(config.host.default_table_prefix, "wp_");
        assert_eq!(config.token.ttl_secs, 86_400);
        assert!(config.observability.is_console_logging());
        assert!(!config.observability.should_rotate_logs());
    }

    #[test]
    fn test_default_config_requires_secret() {
        let issues = TenancyConfig::default().validate().unwrap_err();
        assert!(issues.iter().any(|i| i.contains("install_secret cannot be empty")));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = valid_config();
        let toml_str = config.to_toml().unwrap();
        let parsed = TenancyConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.install_secret, config.install_secret);
        assert_eq!(parsed.host.content_dir, config.host.content_dir);
        assert_eq!(parsed.gateway.bind, config.gateway.bind);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = TenancyConfig::from_toml(
            r#"
name = "tenancy-main"
env = "prod"
install_secret = "s3cr3t-s3cr3t-s3cr3t-s3cr3t-s3cr3t"

[host]
content_dir = "/srv/site/wp-content"
content_url = "https://main.example.com/wp-content"
"#,
        )
        .unwrap();
        assert_eq!(config.host.uploads_subdir, "uploads");
        assert_eq!(config.host.login_path, "/wp-login.php");
        assert_eq!(
            config.host.uploads_url(),
            "https://main.example.com/wp-content/uploads"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = valid_config();
        config.host.content_dir = "relative/wp-content".into();
        config.host.content_url = "ftp://example.com".to_string();
        config.host.default_table_prefix = "wp-; DROP".to_string();
        config.token.ttl_secs = 0;

        let issues = config.validate().unwrap_err();
        let fatal = fatal_errors(&issues);
        assert_eq!(fatal.len(), 4, "{issues:?}");
    }

    #[test]
    fn test_warnings_are_not_fatal() {
        let mut config = valid_config();
        config.env = "prod".to_string();
        config.host.https = false;
        config.install_secret = "short-secret".to_string();

        let issues = config.validate().unwrap_err();
        assert_eq!(issues.len(), 2);
        assert!(fatal_errors(&issues).is_empty());
    }

    #[test]
    fn test_from_file_missing() {
        let err = TenancyConfig::from_file("/nonexistent/tenancy.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_filter_level() {
        let config = valid_config();
        unsafe { std::env::set_var("RUST_LOG", "debug") };
        assert_eq!(config.observability.get_filter_level(), "debug");
        unsafe { std::env::remove_var("RUST_LOG") };
        assert_eq!(config.observability.get_filter_level(), "info");
    }
}
