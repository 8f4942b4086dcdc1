//! 对外协作接口
//!
//! 管理界面、资源管线与扩展模块通过这些方法查询当前请求的租户状态。

use serde::Serialize;
use std::path::PathBuf;

use crate::context::RequestContext;
use crate::notice::{Diagnostics, OperatorNotice};

/// 当前租户信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantInfo {
    pub id: String,
    pub domain: String,
    pub storage_dir: PathBuf,
    pub storage_url: Option<String>,
}

impl RequestContext {
    /// 数据库与存储隔离都已完成时才视为租户请求
    pub fn is_tenant(&self) -> bool {
        self.binding().is_some()
            && self.database_isolation().is_some()
            && self.storage_isolation().is_some()
    }

    /// 当前租户 ID，共享站点为空字符串
    pub fn get_tenant_id(&self) -> String {
        if !self.is_tenant() {
            return String::new();
        }
        self.binding()
            .map(|binding| binding.tenant_id.clone())
            .unwrap_or_default()
    }

    pub fn get_tenant_storage_dir(&self) -> Option<PathBuf> {
        if !self.is_tenant() {
            return None;
        }
        self.storage_isolation().map(|storage| storage.dir.clone())
    }

    pub fn get_tenant_storage_url(&self) -> Option<String> {
        if !self.is_tenant() {
            return None;
        }
        self.storage_isolation()
            .and_then(|storage| self.storage_url(storage))
    }

    pub fn get_tenant_info(&self) -> Option<TenantInfo> {
        if !self.is_tenant() {
            return None;
        }
        let binding = self.binding()?;
        Some(TenantInfo {
            id: binding.tenant_id.clone(),
            domain: binding.domain.clone(),
            storage_dir: self.get_tenant_storage_dir()?,
            storage_url: self.get_tenant_storage_url(),
        })
    }

    /// 隔离前句柄上的原始表前缀
    pub fn original_prefix(&self) -> Option<&str> {
        self.original_prefix.get().map(String::as_str)
    }

    /// 当前租户表前缀
    pub fn table_prefix(&self) -> Option<&str> {
        self.database_isolation()
            .map(|db| db.table_prefix.as_str())
    }

    /// 安装级诊断加上本请求记录的通知
    pub fn diagnostics(&self) -> Vec<OperatorNotice> {
        let mut notices = Diagnostics::collect(self.resolver(), self.is_bootstrapped());
        notices.extend(self.notices());
        notices
    }
}
