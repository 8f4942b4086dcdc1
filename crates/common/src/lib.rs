//! Tenancy 基础设施库
//!
//! 为租户解析内核提供基础组件：租户模型与校验、映射文件存储、
//! 存储路径解析、站点数据库句柄、配置与错误类型

pub mod config;
pub mod error;
pub mod storage;
pub mod tenant;
pub mod util;

// Re-export commonly used types for convenience
pub use config::TenancyConfig;
pub use error::{ConfigError, StorageError};
pub use storage::{
    FileMappingStore, MappingStore, PathResolver, PrefixHandle, StructureKind, TenantMappings,
    UploadArea, UploadDir,
};
pub use tenant::{Tenant, TenantError, TenantRegistry, validate_domain, validate_id};
