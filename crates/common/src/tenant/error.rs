//! 租户错误类型定义
//!
//! 定义了租户管理（写路径）相关的错误类型

use std::fmt;

use thiserror::Error;

use crate::error::StorageError;

/// 域名冲突：`domain` 已经属于 `tenant_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConflict {
    pub domain: String,
    pub tenant_id: String,
}

impl fmt::Display for DomainConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (owned by {})", self.domain, self.tenant_id)
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum TenantError {
    #[error("Invalid tenant ID")]
    InvalidId(String),

    #[error("Please enter at least one valid domain")]
    NoDomains,

    #[error("Invalid domain format(s): {}", .domains.join(", "))]
    InvalidDomains { domains: Vec<String> },

    #[error("Domain(s) already in use: {}", join_display(.conflicts))]
    DuplicateDomain { conflicts: Vec<DomainConflict> },

    #[error("Tenant not found: {0}")]
    NotFound(String),

    #[error("Could not allocate an unused tenant ID")]
    IdExhausted,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TenantError {
    /// 冲突涉及的域名列表
    pub fn conflicting_domains(&self) -> Vec<&str> {
        match self {
            TenantError::DuplicateDomain { conflicts } => {
                conflicts.iter().map(|c| c.domain.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}
