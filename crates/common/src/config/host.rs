//! 宿主站点配置
//!
//! 描述宿主的内容目录布局、默认表前缀以及管理入口路径。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 宿主站点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// 宿主内容目录（绝对路径）
    pub content_dir: PathBuf,

    /// 内容目录对应的公开 URL
    pub content_url: String,

    /// 宿主通用上传目录，相对于 `content_dir`
    #[serde(default = "default_uploads_subdir")]
    pub uploads_subdir: String,

    /// 旧版存储根目录名：`{content_dir}/{legacy_dir_name}`
    #[serde(default = "default_legacy_dir_name")]
    pub legacy_dir_name: String,

    /// 当前版存储根目录名：`{uploads}/{current_dir_name}`
    #[serde(default = "default_current_dir_name")]
    pub current_dir_name: String,

    /// 运维指定的存储根目录（可选），优先于自动探测
    #[serde(default)]
    pub custom_base_path: Option<PathBuf>,

    /// 自定义存储根目录对应的公开 URL（可选）
    #[serde(default)]
    pub custom_base_url: Option<String>,

    /// 宿主默认表前缀
    #[serde(default = "default_table_prefix")]
    pub default_table_prefix: String,

    /// 生成管理入口 URL 时是否使用 https
    #[serde(default = "default_https")]
    pub https: bool,

    #[serde(default = "default_admin_path")]
    pub admin_path: String,

    #[serde(default = "default_login_path")]
    pub login_path: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("/var/www/html/wp-content"),
            content_url: "https://localhost/wp-content".to_string(),
            uploads_subdir: default_uploads_subdir(),
            legacy_dir_name: default_legacy_dir_name(),
            current_dir_name: default_current_dir_name(),
            custom_base_path: None,
            custom_base_url: None,
            default_table_prefix: default_table_prefix(),
            https: default_https(),
            admin_path: default_admin_path(),
            login_path: default_login_path(),
        }
    }
}

impl HostConfig {
    /// 宿主通用上传目录的绝对路径
    pub fn uploads_dir(&self) -> PathBuf {
        self.content_dir.join(&self.uploads_subdir)
    }

    /// 宿主通用上传目录的公开 URL
    pub fn uploads_url(&self) -> String {
        format!(
            "{}/{}",
            self.content_url.trim_end_matches('/'),
            self.uploads_subdir.trim_matches('/')
        )
    }

    /// 管理入口协议
    pub fn scheme(&self) -> &'static str {
        if self.https { "https" } else { "http" }
    }
}

fn default_uploads_subdir() -> String {
    "uploads".to_string()
}

fn default_legacy_dir_name() -> String {
    "grabwp".to_string()
}

fn default_current_dir_name() -> String {
    "grabwp-tenancy".to_string()
}

fn default_table_prefix() -> String {
    "wp_".to_string()
}

fn default_https() -> bool {
    true
}

fn default_admin_path() -> String {
    "/wp-admin/".to_string()
}

fn default_login_path() -> String {
    "/wp-login.php".to_string()
}
