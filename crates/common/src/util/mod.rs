//! 通用工具模块
//!
//! 提供作用域重入保护、文件系统辅助函数等

pub mod fs;
pub mod guard;

pub use guard::{ReentrancyFlag, ReentrancyGuard};
