//! 宿主上传目录抽象
//!
//! 宿主通过 `UploadArea` 回答"当前上传目录在哪里"。内核在租户请求上
//! 安装覆盖实现，共享站点则直接使用 `SharedUploads`。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::HostConfig;

/// 上传目录描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDir {
    /// 当前上传目录（basedir + subdir）
    pub path: PathBuf,
    /// 当前上传目录 URL（baseurl + subdir）
    pub url: String,
    /// 子目录（如 `/2024/05`），可为空
    pub subdir: String,
    pub basedir: PathBuf,
    pub baseurl: String,
}

impl UploadDir {
    /// 以 basedir/baseurl 构造，subdir 为空
    pub fn rooted(basedir: PathBuf, baseurl: String) -> Self {
        Self {
            path: basedir.clone(),
            url: baseurl.clone(),
            subdir: String::new(),
            basedir,
            baseurl,
        }
    }

    /// 保留 subdir，替换 basedir/baseurl，并据此重算 path/url
    pub fn rebase(&self, basedir: PathBuf, baseurl: String) -> Self {
        let subdir = self.subdir.trim_start_matches('/');
        let (path, url) = if subdir.is_empty() {
            (basedir.clone(), baseurl.clone())
        } else {
            (
                basedir.join(subdir),
                format!("{}/{}", baseurl.trim_end_matches('/'), subdir),
            )
        };
        Self {
            path,
            url,
            subdir: self.subdir.clone(),
            basedir,
            baseurl,
        }
    }
}

/// 上传目录提供者
pub trait UploadArea {
    fn upload_dir(&self) -> UploadDir;
}

/// 宿主默认（共享站点）上传目录
#[derive(Debug, Clone)]
pub struct SharedUploads {
    basedir: PathBuf,
    baseurl: String,
    subdir: String,
}

impl SharedUploads {
    pub fn new(host: &HostConfig) -> Self {
        Self {
            basedir: host.uploads_dir(),
            baseurl: host.uploads_url(),
            subdir: String::new(),
        }
    }

    /// 设置子目录（如按年月分目录）
    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = subdir.into();
        self
    }
}

impl UploadArea for SharedUploads {
    fn upload_dir(&self) -> UploadDir {
        let mut root = UploadDir::rooted(self.basedir.clone(), self.baseurl.clone());
        root.subdir = self.subdir.clone();
        root.rebase(self.basedir.clone(), self.baseurl.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_uploads_from_host() {
        let host = HostConfig {
            content_dir: "/srv/site/wp-content".into(),
            content_url: "https://main.example.com/wp-content/".to_string(),
            ..Default::default()
        };
        let dir = SharedUploads::new(&host).upload_dir();
        assert_eq!(dir.basedir, PathBuf::from("/srv/site/wp-content/uploads"));
        assert_eq!(dir.baseurl, "https://main.example.com/wp-content/uploads");
        assert_eq!(dir.path, dir.basedir);
    }

    #[test]
    fn test_rebase_keeps_subdir() {
        let host = HostConfig {
            content_dir: "/srv/site/wp-content".into(),
            content_url: "https://main.example.com/wp-content".to_string(),
            ..Default::default()
        };
        let dir = SharedUploads::new(&host).with_subdir("/2024/05").upload_dir();
        assert_eq!(dir.path, PathBuf::from("/srv/site/wp-content/uploads/2024/05"));

        let rebased = dir.rebase(
            "/srv/tenants/ab12cd/uploads".into(),
            "https://cdn.example.com/ab12cd/uploads".to_string(),
        );
        assert_eq!(rebased.subdir, "/2024/05");
        assert_eq!(rebased.path, PathBuf::from("/srv/tenants/ab12cd/uploads/2024/05"));
        assert_eq!(rebased.url, "https://cdn.example.com/ab12cd/uploads/2024/05");
    }
}
