//! 文件系统辅助函数
//!
//! 原子写入（临时文件 + rename）、目录创建与递归删除

use std::io::Write;
use std::path::Path;

use tempfile::Builder;
use tracing::debug;

use crate::error::StorageError;

/// 原子地写入文件内容
///
/// 先写入同目录下的临时文件并 fsync，再 rename 覆盖目标文件，
/// 并发读取者只会看到旧内容或新内容，不会看到写了一半的文件。
///
/// 已存在的目标保留原权限；新文件按 0644 创建（受 umask 过滤），
/// 运维账户写入的文件 Web 进程仍可读取。
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let dir = path.parent().ok_or_else(|| StorageError::DirectoryMissing {
        path: path.display().to_string(),
    })?;
    ensure_dir(dir)?;

    let existing = std::fs::metadata(path).ok().map(|m| m.permissions());
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    let mut tmp = builder
        .tempfile_in(dir)
        .map_err(|e| StorageError::write_failed(dir, e))?;
    if let Some(perms) = existing {
        tmp.as_file()
            .set_permissions(perms)
            .map_err(|e| StorageError::write_failed(path, e))?;
    }
    tmp.write_all(contents)
        .map_err(|e| StorageError::write_failed(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StorageError::write_failed(path, e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::write_failed(path, e.error))?;

    debug!("Atomically wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// 确保目录存在（不存在则递归创建）
///
/// 并发创建导致的 "already exists" 视为成功。
pub fn ensure_dir(path: &Path) -> Result<(), StorageError> {
    if path.is_dir() {
        return Ok(());
    }
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => Ok(()),
        Err(e) => Err(StorageError::write_failed(path, e)),
    }
}

/// 递归删除目录，目录不存在时视为成功
pub fn remove_dir_recursive(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::remove_dir_all(path).map_err(|e| StorageError::write_failed(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parent_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("nested/dir/file.json");

        atomic_write(&target, b"first").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"first");

        atomic_write(&target, b"second").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"second");

        // 不应残留临时文件
        let entries: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("tenants.json");

        // 新文件不应是仅属主可读
        atomic_write(&target, b"{}").unwrap();
        let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_ne!(mode & 0o044, 0, "new file mode {mode:o} is owner-only");
        assert_eq!(mode & 0o022, 0);

        // 覆盖写保留运维设置的权限
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o640)).unwrap();
        atomic_write(&target, b"{\"a\":1}").unwrap();
        let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b/c");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_remove_missing_dir_is_ok() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("missing");
        assert!(remove_dir_recursive(&dir).is_ok());

        std::fs::create_dir_all(dir.join("inner")).unwrap();
        std::fs::write(dir.join("inner/file"), b"x").unwrap();
        remove_dir_recursive(&dir).unwrap();
        assert!(!dir.exists());
    }
}
