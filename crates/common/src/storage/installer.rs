//! 安装初始化
//!
//! 创建存储根目录、禁止 Web 访问的 `.htaccess` 以及空映射文件。
//! 可重复执行，已存在的文件不会被覆盖。

use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::error::StorageError;
use crate::storage::mapping::{FileMappingStore, MappingStore, TenantMappings};
use crate::storage::paths::PathResolver;
use crate::util::fs::{atomic_write, ensure_dir};

const HTACCESS_FILE: &str = ".htaccess";

const HTACCESS_CONTENT: &str = r#"# Tenancy storage protection
Options -Indexes
<FilesMatch "\.(json|php)$">
    <IfModule mod_authz_core.c>
        Require all denied
    </IfModule>
    <IfModule !mod_authz_core.c>
        Order allow,deny
        Deny from all
    </IfModule>
</FilesMatch>
<FilesMatch "^\.">
    <IfModule mod_authz_core.c>
        Require all denied
    </IfModule>
    <IfModule !mod_authz_core.c>
        Order allow,deny
        Deny from all
    </IfModule>
</FilesMatch>
"#;

/// 安装结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub base_path: PathBuf,
    pub created_base: bool,
    pub created_htaccess: bool,
    pub created_mappings: bool,
}

pub struct Installer;

impl Installer {
    pub fn install(resolver: &PathResolver) -> Result<InstallReport, StorageError> {
        let base_path = resolver.base_path();
        let created_base = !base_path.is_dir();
        ensure_dir(&base_path)?;

        let htaccess = base_path.join(HTACCESS_FILE);
        let created_htaccess = !htaccess.exists();
        if created_htaccess {
            atomic_write(&htaccess, HTACCESS_CONTENT.as_bytes())?;
        }

        let store = FileMappingStore::new(resolver.mappings_file_path());
        let created_mappings = !store.exists();
        if created_mappings {
            store.save(&TenantMappings::new())?;
        }

        let report = InstallReport {
            base_path,
            created_base,
            created_htaccess,
            created_mappings,
        };
        info!(
            base = %report.base_path.display(),
            created_base = report.created_base,
            created_htaccess = report.created_htaccess,
            created_mappings = report.created_mappings,
            "Tenancy storage installed"
        );
        Ok(report)
    }
}
