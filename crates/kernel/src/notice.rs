//! 运维诊断
//!
//! 启动接入缺失、存储根目录或映射文件缺失等问题不会中断请求，
//! 但必须以高可见度暴露给运维：既输出日志，也以结构化形式返回给宿主界面。

use serde::Serialize;
use std::path::PathBuf;
use strum::Display;
use tracing::{error, info, warn};

use tenancy_common::storage::{MAPPINGS_FILE, MappingStore, PathResolver, StructureKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// 面向运维的通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorNotice {
    /// 宿主启动流程未调用内核
    BootstrapNotWired,
    /// 存储根目录不存在
    BaseDirMissing { path: PathBuf },
    /// 映射文件不存在
    MappingFileMissing { path: PathBuf },
    /// 旧版映射文件尚未转换，其中的租户无法解析
    LegacyMappingsUnconverted { path: PathBuf },
    /// 使用旧版布局
    LegacyLayout { path: PathBuf },
    /// 使用自定义存储根目录
    CustomLayout { path: PathBuf },
    /// 租户存储目录创建失败，上传文件无处可写
    StorageRootUnavailable {
        tenant_id: String,
        path: PathBuf,
        reason: String,
    },
}

impl OperatorNotice {
    pub fn severity(&self) -> Severity {
        match self {
            OperatorNotice::LegacyLayout { .. } | OperatorNotice::CustomLayout { .. } => {
                Severity::Info
            }
            OperatorNotice::BootstrapNotWired => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            OperatorNotice::BootstrapNotWired => {
                "Tenancy kernel is installed but not wired into the host bootstrap; every request is served as the shared site".to_string()
            }
            OperatorNotice::BaseDirMissing { path } => format!(
                "Tenancy base directory is missing: {}. Run the installer again or create the directory manually",
                path.display()
            ),
            OperatorNotice::MappingFileMissing { path } => format!(
                "Tenant mappings file is missing: {}. Run the installer again or create the file manually",
                path.display()
            ),
            OperatorNotice::LegacyMappingsUnconverted { path } => format!(
                "Legacy tenant mappings found at {} but no {MAPPINGS_FILE} next to it; these tenants are served as the shared site until the mappings are recreated",
                path.display()
            ),
            OperatorNotice::LegacyLayout { path } => format!(
                "Using legacy storage layout at {} for backward compatibility; new tenants use the same layout",
                path.display()
            ),
            OperatorNotice::CustomLayout { path } => {
                format!("Using custom storage location {}", path.display())
            }
            OperatorNotice::StorageRootUnavailable {
                tenant_id,
                path,
                reason,
            } => format!(
                "Storage root for tenant {tenant_id} could not be created at {}: {reason}",
                path.display()
            ),
        }
    }

    /// 以与严重程度匹配的级别输出日志
    pub fn log(&self) {
        match self.severity() {
            Severity::Info => info!("{}", self.message()),
            Severity::Warning => warn!("{}", self.message()),
            Severity::Error => error!("{}", self.message()),
        }
    }
}

/// 安装级诊断
pub struct Diagnostics;

impl Diagnostics {
    /// 收集全部安装级通知；各项检查相互独立
    pub fn collect(resolver: &PathResolver, bootstrap_wired: bool) -> Vec<OperatorNotice> {
        let mut notices = Vec::new();

        if !bootstrap_wired {
            notices.push(OperatorNotice::BootstrapNotWired);
        }

        let base = resolver.base_path();
        if !base.is_dir() {
            notices.push(OperatorNotice::BaseDirMissing { path: base.clone() });
        }

        let mappings = resolver.mappings_file_path();
        if !mappings.is_file() {
            notices.push(OperatorNotice::MappingFileMissing { path: mappings });
        }

        if let Some(path) = resolver.unconverted_legacy_mappings() {
            notices.push(OperatorNotice::LegacyMappingsUnconverted { path });
        }

        match resolver.structure_kind() {
            StructureKind::Legacy => notices.push(OperatorNotice::LegacyLayout { path: base }),
            StructureKind::Custom => notices.push(OperatorNotice::CustomLayout { path: base }),
            StructureKind::Current => {}
        }

        for notice in &notices {
            notice.log();
        }
        notices
    }

    /// 基于映射存储后端判断映射是否存在（非文件后端）
    pub fn mapping_store_missing(store: &dyn MappingStore) -> Option<OperatorNotice> {
        (!store.exists()).then(|| OperatorNotice::MappingFileMissing {
            path: PathBuf::from(store.location()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenancy_common::config::HostConfig;
    use tenancy_common::storage::{FileMappingStore, Installer};
    use tempfile::TempDir;

    fn resolver(temp: &TempDir) -> PathResolver {
        PathResolver::new(HostConfig {
            content_dir: temp.path().to_path_buf(),
            content_url: "https://main.example.com/wp-content".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_fresh_install_reports_missing_pieces_independently() {
        let temp = TempDir::new().unwrap();
        let notices = Diagnostics::collect(&resolver(&temp), false);

        assert!(notices.contains(&OperatorNotice::BootstrapNotWired));
        assert!(
            notices
                .iter()
                .any(|n| matches!(n, OperatorNotice::BaseDirMissing { .. }))
        );
        assert!(
            notices
                .iter()
                .any(|n| matches!(n, OperatorNotice::MappingFileMissing { .. }))
        );
    }

    #[test]
    fn test_directory_without_mapping_file() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver(&temp);
        std::fs::create_dir_all(resolver.base_path()).unwrap();

        let notices = Diagnostics::collect(&resolver, true);
        assert_eq!(
            notices,
            vec![OperatorNotice::MappingFileMissing {
                path: resolver.mappings_file_path()
            }]
        );
    }

    #[test]
    fn test_installed_is_clean() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver(&temp);
        Installer::install(&resolver).unwrap();

        assert!(Diagnostics::collect(&resolver, true).is_empty());
        let store = FileMappingStore::new(resolver.mappings_file_path());
        assert!(Diagnostics::mapping_store_missing(&store).is_none());
    }

    #[test]
    fn test_legacy_layout_is_informational() {
        let temp = TempDir::new().unwrap();
        let legacy = temp.path().join("grabwp");
        std::fs::create_dir_all(&legacy).unwrap();
        std::fs::write(legacy.join("tenants.json"), "{}").unwrap();

        let notices = Diagnostics::collect(&resolver(&temp), true);
        assert_eq!(notices, vec![OperatorNotice::LegacyLayout { path: legacy }]);
        assert_eq!(notices[0].severity(), Severity::Info);
    }

    #[test]
    fn test_unconverted_legacy_mappings_are_reported() {
        let temp = TempDir::new().unwrap();
        let legacy = temp.path().join("grabwp");
        std::fs::create_dir_all(&legacy).unwrap();
        std::fs::write(legacy.join("tenants.php"), "<?php").unwrap();

        let notices = Diagnostics::collect(&resolver(&temp), true);
        let unconverted = OperatorNotice::LegacyMappingsUnconverted {
            path: legacy.join("tenants.php"),
        };
        assert!(notices.contains(&unconverted));
        assert_eq!(unconverted.severity(), Severity::Error);
        assert!(notices.contains(&OperatorNotice::MappingFileMissing {
            path: legacy.join("tenants.json")
        }));
        assert!(notices.contains(&OperatorNotice::LegacyLayout { path: legacy }));
    }

    #[test]
    fn test_notice_serializes_with_kind_tag() {
        let json = serde_json::to_value(OperatorNotice::BaseDirMissing {
            path: PathBuf::from("/srv/base"),
        })
        .unwrap();
        assert_eq!(json["kind"], "base_dir_missing");
        assert_eq!(json["path"], "/srv/base");
    }
}
