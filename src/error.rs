//! 统一错误处理模型
//!
//! 提供主程序 tenancy 的顶层错误类型，聚合各子 crate 与依赖 crate 的错误

use thiserror::Error;

/// 主程序的统一错误枚举
#[derive(Debug, Error)]
pub enum Error {
    // ========== 配置相关错误 ==========
    /// 配置文件相关错误
    #[error("Configuration error: {0}")]
    Config(#[from] tenancy_common::error::ConfigError),

    // ========== 基础库错误 ==========
    /// 租户写入错误（域名冲突、ID 无效等）
    #[error(transparent)]
    Tenant(#[from] tenancy_common::TenantError),

    /// 存储错误
    #[error("Storage error: {0}")]
    Storage(#[from] tenancy_common::error::StorageError),

    // ========== 内核与令牌代理错误 ==========
    #[error("Kernel error: {0}")]
    Kernel(#[from] tenancy_kernel::KernelError),

    #[error("Admin token error: {0}")]
    Broker(#[from] tenancy_broker::BrokerError),

    // ========== 系统级错误 ==========
    /// I/O 操作错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // ========== 业务逻辑错误 ==========
    /// 服务启动失败
    #[error("Service startup failed: {message}")]
    ServiceStartup { message: String },

    // ========== 通用错误 ==========
    /// Anyhow 错误兼容层
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    /// 自定义错误消息
    #[error("{message}")]
    Custom { message: String },
}

/// 统一的 Result 类型
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// 创建自定义错误
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    /// 创建服务启动失败错误
    pub fn service_startup(message: impl Into<String>) -> Self {
        Self::ServiceStartup {
            message: message.into(),
        }
    }
}
