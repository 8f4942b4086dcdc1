//! 存储相关错误类型
//!
//! 定义所有与文件系统、存储后端相关的错误

use thiserror::Error;

/// 存储相关错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Directory missing: {path}")]
    DirectoryMissing { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Write failed for {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage backend error: {backend}")]
    Backend { backend: String },
}

impl StorageError {
    /// 根据 IO 错误类型映射写入失败
    pub fn write_failed(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.display().to_string(),
            },
            _ => Self::WriteFailed {
                path: path.display().to_string(),
                source,
            },
        }
    }
}
