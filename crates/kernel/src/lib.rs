//! Tenancy Kernel - 租户解析与隔离内核
//!
//! 每个请求在最早阶段运行一次：
//! 1. 读取 Host 请求头（或预设租户 ID）
//! 2. 按映射表识别租户
//! 3. 固定数据库表前缀与存储根，本请求内不可再被覆盖
//!
//! 未命中任何租户的请求按共享站点处理。

pub mod context;
pub mod error;
pub mod identify;
pub mod info;
pub mod isolation;
pub mod notice;
pub mod pipeline;
pub mod server;

// Re-export commonly used items
pub use context::{BindingSource, RequestContext, TenantBinding, WriteProtection};
pub use error::KernelError;
pub use identify::identify;
pub use info::TenantInfo;
pub use isolation::{configure_database, configure_storage, table_prefix};
pub use notice::{Diagnostics, OperatorNotice, Severity};
pub use pipeline::{BootstrapOutcome, Phase, bootstrap};
pub use server::{Protocol, RequestInput, ServerInfo};
