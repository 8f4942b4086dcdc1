//! 租户管理模块
//!
//! 按照概念独立性原则组织，每个概念都有独立的文件：
//! - `model.rs` - 核心租户数据结构
//! - `validation.rs` - ID 与域名校验
//! - `repository.rs` - 基于映射存储的写操作
//! - `error.rs` - 错误类型

pub mod error;
pub mod model;
pub mod repository;
pub mod validation;

pub use error::{DomainConflict, TenantError};
pub use model::{Tenant, TenantStatus, TenantSummary, generate_id};
pub use repository::TenantRegistry;
pub use validation::{validate_domain, validate_id};
