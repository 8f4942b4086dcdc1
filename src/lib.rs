//! # tenancy
//!
//! 多租户解析与隔离内核的宿主程序：命令行工具与 HTTP 网关

pub mod gateway;

// Re-export commonly used types
pub use gateway::{GatewayState, ResolvedRequest, create_router};
pub use tenancy_common::TenancyConfig;
