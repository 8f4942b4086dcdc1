//! 令牌代理错误类型

use tenancy_common::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Tenant {0} has no domains")]
    NoPrimaryDomain(String),

    #[error("Invalid tenant ID: {0}")]
    InvalidTenantId(String),

    #[error("Invalid table prefix: {0}")]
    InvalidPrefix(String),

    #[error("Token file is corrupt: {0}")]
    CorruptTokenFile(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Admin directory error: {0}")]
    Directory(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(String),
}
