//! 内核错误类型

use tenancy_common::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("Invalid tenant ID: {0}")]
    InvalidTenantId(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
