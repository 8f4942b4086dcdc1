//! 隔离配置
//!
//! 为已绑定的租户固定数据库前缀与存储根。两个步骤都是幂等的且
//! 首次写入者生效：同一请求内再次调用不会改变已经固定的值。

use std::cell::OnceCell;
use tracing::{debug, info, warn};

use tenancy_common::storage::PrefixHandle;
use tenancy_common::tenant::validate_id;

use crate::context::{DatabaseIsolation, RequestContext, StorageIsolation};
use crate::error::KernelError;

/// 租户表前缀：`{tenant_id}_`
pub fn table_prefix(tenant_id: &str) -> String {
    format!("{tenant_id}_")
}

/// 固定数据库前缀
///
/// 首次调用时记录句柄上原有的前缀。已经固定过时，把固定值重新应用到
/// 句柄上并返回它，忽略本次请求的租户 ID。
pub fn configure_database<'a>(
    ctx: &'a RequestContext,
    db: &mut dyn PrefixHandle,
    tenant_id: &str,
) -> Result<&'a DatabaseIsolation, KernelError> {
    if !validate_id(tenant_id) {
        return Err(KernelError::InvalidTenantId(tenant_id.to_string()));
    }

    ctx.original_prefix.get_or_init(|| db.prefix().to_string());

    if let Some(existing) = ctx.database.get() {
        if existing.tenant_id != tenant_id {
            warn!(
                configured = %existing.tenant_id,
                requested = %tenant_id,
                "Database prefix already fixed for this request, ignoring"
            );
        }
        if db.prefix() != existing.table_prefix {
            db.set_prefix(&existing.table_prefix);
        }
        return Ok(existing);
    }

    let prefix = table_prefix(tenant_id);
    db.set_prefix(&prefix);
    debug!(tenant_id = %tenant_id, prefix = %prefix, "Database prefix configured");

    Ok(ctx.database.get_or_init(|| DatabaseIsolation {
        tenant_id: tenant_id.to_string(),
        table_prefix: prefix,
    }))
}

/// 固定存储根并安装上传目录覆盖
///
/// 目录不存在时创建；创建失败不会中断请求，但会记录
/// `OperatorNotice::StorageRootUnavailable`。
pub fn configure_storage<'a>(
    ctx: &'a RequestContext,
    tenant_id: &str,
) -> Result<&'a StorageIsolation, KernelError> {
    if !validate_id(tenant_id) {
        return Err(KernelError::InvalidTenantId(tenant_id.to_string()));
    }

    if let Some(existing) = ctx.storage.get() {
        if existing.tenant_id != tenant_id {
            warn!(
                configured = %existing.tenant_id,
                requested = %tenant_id,
                "Storage root already fixed for this request, ignoring"
            );
        }
        return Ok(existing);
    }

    let dir = ctx
        .resolver()
        .tenant_storage_path(tenant_id)
        .ok_or_else(|| KernelError::InvalidTenantId(tenant_id.to_string()))?;

    let storage = ctx.storage.get_or_init(|| StorageIsolation {
        tenant_id: tenant_id.to_string(),
        dir,
        url: OnceCell::new(),
    });

    ctx.ensure_storage_dir(storage);
    let url = ctx.storage_url(storage);
    info!(
        tenant_id = %tenant_id,
        dir = %storage.dir.display(),
        url = url.as_deref().unwrap_or(""),
        "Tenant storage root configured"
    );

    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::OperatorNotice;
    use crate::server::RequestInput;
    use std::sync::Arc;
    use tenancy_common::config::HostConfig;
    use tenancy_common::storage::{FileMappingStore, PathResolver, TablePrefix, UploadArea};
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> RequestContext {
        let host = HostConfig {
            content_dir: temp.path().to_path_buf(),
            content_url: "https://main.example.com/wp-content".to_string(),
            ..Default::default()
        };
        let store = FileMappingStore::new(PathResolver::new(host.clone()).mappings_file_path());
        RequestContext::new(RequestInput::web("shop.example.com"), host, Arc::new(store))
    }

    #[test]
    fn test_database_prefix_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let mut db = TablePrefix::new("wp_");

        let first = configure_database(&ctx, &mut db, "ab12cd").unwrap().clone();
        assert_eq!(db.prefix(), "ab12cd_");

        let second = configure_database(&ctx, &mut db, "ab12cd").unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(db.prefix(), "ab12cd_");
        assert_eq!(ctx.original_prefix.get().map(String::as_str), Some("wp_"));
    }

    #[test]
    fn test_first_writer_wins() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let mut db = TablePrefix::new("wp_");

        configure_database(&ctx, &mut db, "ab12cd").unwrap();
        let result = configure_database(&ctx, &mut db, "zz98yx").unwrap();
        assert_eq!(result.tenant_id, "ab12cd");
        assert_eq!(db.prefix(), "ab12cd_");

        configure_storage(&ctx, "ab12cd").unwrap();
        let storage = configure_storage(&ctx, "zz98yx").unwrap();
        assert_eq!(storage.tenant_id, "ab12cd");
    }

    #[test]
    fn test_prefix_reapplied_to_fresh_handle() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let mut first = TablePrefix::new("wp_");
        configure_database(&ctx, &mut first, "ab12cd").unwrap();

        let mut fresh = TablePrefix::new("other_");
        configure_database(&ctx, &mut fresh, "ab12cd").unwrap();
        assert_eq!(fresh.prefix(), "ab12cd_");
        // 原始前缀只在首次调用时记录
        assert_eq!(ctx.original_prefix.get().map(String::as_str), Some("wp_"));
    }

    #[test]
    fn test_invalid_tenant_id_is_rejected() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let mut db = TablePrefix::new("wp_");

        assert!(configure_database(&ctx, &mut db, "x'; --").is_err());
        assert_eq!(db.prefix(), "wp_");
        assert!(configure_storage(&ctx, "../../etc").is_err());
        assert!(ctx.storage_isolation().is_none());
    }

    #[test]
    fn test_storage_override_redirects_uploads() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);

        let storage = configure_storage(&ctx, "ab12cd").unwrap();
        let expected_dir = temp
            .path()
            .join("uploads/grabwp-tenancy/ab12cd/uploads");
        assert_eq!(storage.dir, expected_dir);
        assert!(expected_dir.is_dir());

        let uploads = ctx.upload_dir();
        assert_eq!(uploads.basedir, expected_dir);
        assert_eq!(
            uploads.baseurl,
            "https://main.example.com/wp-content/uploads/grabwp-tenancy/ab12cd/uploads"
        );
        // 重复调用结果一致
        assert_eq!(ctx.upload_dir(), uploads);
    }

    #[test]
    fn test_storage_creation_failure_is_recorded() {
        let temp = TempDir::new().unwrap();
        // 在存储根位置放一个普通文件，使目录创建失败
        let base_parent = temp.path().join("uploads");
        std::fs::create_dir_all(&base_parent).unwrap();
        std::fs::write(base_parent.join("grabwp-tenancy"), "not a dir").unwrap();

        let ctx = context(&temp);
        let storage = configure_storage(&ctx, "ab12cd").unwrap();
        assert!(!storage.dir.is_dir());

        let notices = ctx.notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(
            &notices[0],
            OperatorNotice::StorageRootUnavailable { tenant_id, .. } if tenant_id == "ab12cd"
        ));

        // 覆盖依然生效，上传不会落到共享目录
        assert_eq!(ctx.upload_dir().basedir, storage.dir);
        assert_eq!(ctx.notices().len(), 1);
    }
}
