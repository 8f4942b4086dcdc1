//! 存储路径解析
//!
//! 计算存储根目录（base path）以及每个租户的存储子树。
//!
//! 存储根目录按以下优先级确定，先命中者生效：
//! 1. 运维显式配置的路径（`host.custom_base_path`）
//! 2. 旧版布局：`{content_dir}/{legacy_dir_name}/` 下存在 `tenants.json`
//!    或旧版 `tenants.php` 时，整个安装固定使用旧版目录（单向锁定）
//! 3. 当前布局：`{uploads}/{current_dir_name}`

use serde::Serialize;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::config::HostConfig;
use crate::storage::uploads::UploadArea;
use crate::tenant::validation::validate_id;
use crate::util::ReentrancyFlag;

/// 映射文件名
pub const MAPPINGS_FILE: &str = "tenants.json";

/// 旧版安装遗留的映射文件，只用于布局探测，从不读取执行
pub const LEGACY_MAPPINGS_FILE: &str = "tenants.php";

/// 租户存储子目录名
pub const TENANT_UPLOADS_DIR: &str = "uploads";

/// 存储布局类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StructureKind {
    Legacy,
    Current,
    Custom,
}

/// 管理界面展示用的路径状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStatus {
    pub current_base: PathBuf,
    pub structure_kind: StructureKind,
    pub mappings_file_exists: bool,
    pub using_legacy: bool,
    pub is_custom: bool,
}

/// 路径解析器
///
/// 每次调用都重新探测磁盘，不缓存结果。URL 推导持有一个重入标志，
/// 在宿主上传目录解析过程中再次进入时退化为基于 content_url 的拼接。
#[derive(Debug)]
pub struct PathResolver {
    host: HostConfig,
    url_guard: ReentrancyFlag,
}

impl PathResolver {
    pub fn new(host: HostConfig) -> Self {
        Self {
            host,
            url_guard: ReentrancyFlag::new(),
        }
    }

    pub fn host(&self) -> &HostConfig {
        &self.host
    }

    /// 旧版存储根目录
    pub fn legacy_base(&self) -> PathBuf {
        self.host.content_dir.join(&self.host.legacy_dir_name)
    }

    /// 当前版存储根目录
    pub fn current_base(&self) -> PathBuf {
        self.host.uploads_dir().join(&self.host.current_dir_name)
    }

    /// 存储根目录
    pub fn base_path(&self) -> PathBuf {
        if let Some(custom) = &self.host.custom_base_path {
            return custom.clone();
        }

        let legacy = self.legacy_base();
        if legacy.join(MAPPINGS_FILE).exists() || legacy.join(LEGACY_MAPPINGS_FILE).exists() {
            return legacy;
        }

        self.current_base()
    }

    /// 旧版映射文件存在但尚未转换为 JSON 时返回其路径
    pub fn unconverted_legacy_mappings(&self) -> Option<PathBuf> {
        if self.host.custom_base_path.is_some() {
            return None;
        }
        let legacy = self.legacy_base();
        let php = legacy.join(LEGACY_MAPPINGS_FILE);
        (php.is_file() && !legacy.join(MAPPINGS_FILE).exists()).then_some(php)
    }

    /// 映射文件路径
    pub fn mappings_file_path(&self) -> PathBuf {
        self.config_file_path(MAPPINGS_FILE)
    }

    /// 存储根目录下的配置文件路径（令牌文件等）
    pub fn config_file_path(&self, file_name: &str) -> PathBuf {
        self.base_path().join(file_name)
    }

    /// 租户存储目录：`{base}/{id}/uploads`，ID 不合法时返回 `None`
    pub fn tenant_storage_path(&self, tenant_id: &str) -> Option<PathBuf> {
        if !validate_id(tenant_id) {
            return None;
        }
        Some(self.tenant_root(tenant_id).join(TENANT_UPLOADS_DIR))
    }

    fn tenant_root(&self, tenant_id: &str) -> PathBuf {
        self.base_path().join(tenant_id)
    }

    /// 租户存储 URL
    ///
    /// 存储根位于宿主上传目录内时基于上传目录 URL 拼接，否则基于 content_url。
    /// `uploads` 在解析过程中若再次调用本方法，会走 content_url 拼接分支。
    pub fn tenant_storage_url(&self, tenant_id: &str, uploads: &dyn UploadArea) -> Option<String> {
        if !validate_id(tenant_id) {
            return None;
        }

        let base = self.base_path();
        let suffix = format!("{tenant_id}/{TENANT_UPLOADS_DIR}");

        let upload_dir = {
            let Some(_guard) = self.url_guard.enter() else {
                debug!("tenant_storage_url re-entered, using content_url fallback");
                return self.content_relative_url(&base, &suffix);
            };
            uploads.upload_dir()
        };

        if let Ok(relative) = base.strip_prefix(&upload_dir.basedir) {
            return Some(join_url(&upload_dir.baseurl, &[&path_to_url(relative), &suffix]));
        }

        self.content_relative_url(&base, &suffix)
    }

    fn content_relative_url(&self, base: &Path, suffix: &str) -> Option<String> {
        if let (Some(_), Some(url)) = (&self.host.custom_base_path, &self.host.custom_base_url) {
            return Some(join_url(url, &[suffix]));
        }

        match base.strip_prefix(&self.host.content_dir) {
            Ok(relative) => Some(join_url(
                &self.host.content_url,
                &[&path_to_url(relative), suffix],
            )),
            Err(_) => {
                warn!(
                    base = %base.display(),
                    "Storage root is outside the content directory and has no public URL"
                );
                None
            }
        }
    }

    /// 当前布局类型
    pub fn structure_kind(&self) -> StructureKind {
        let base = self.base_path();
        if base == self.legacy_base() {
            StructureKind::Legacy
        } else if base == self.current_base() {
            StructureKind::Current
        } else {
            StructureKind::Custom
        }
    }

    pub fn is_using_legacy(&self) -> bool {
        self.structure_kind() == StructureKind::Legacy
    }

    pub fn path_status(&self) -> PathStatus {
        let current_base = self.base_path();
        let structure_kind = self.structure_kind();
        PathStatus {
            mappings_file_exists: current_base.join(MAPPINGS_FILE).exists(),
            current_base,
            structure_kind,
            using_legacy: structure_kind == StructureKind::Legacy,
            is_custom: structure_kind == StructureKind::Custom,
        }
    }
}

fn path_to_url(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            url.push('/');
            url.push_str(segment);
        }
    }
    url
}
