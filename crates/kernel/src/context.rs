//! 请求上下文
//!
//! 每个请求构造一个 `RequestContext`，请求结束时丢弃。服务器信息、映射表、
//! 租户绑定与隔离状态都缓存在这里，不存在跨请求的全局可变状态。
//!
//! 上下文内部使用 `Cell` / `OnceCell`，因此是 `!Sync` 的，只在处理请求的
//! 调用栈内使用。

use serde::Serialize;
use std::cell::{Cell, OnceCell, RefCell};
use std::path::PathBuf;
use std::sync::Arc;
use strum::Display;
use tracing::error;

use tenancy_common::config::HostConfig;
use tenancy_common::storage::{
    MappingStore, PathResolver, SharedUploads, TenantMappings, UploadArea, UploadDir,
};
use tenancy_common::util::ReentrancyFlag;
use tenancy_common::util::fs::ensure_dir;

use crate::notice::OperatorNotice;
use crate::server::{RequestInput, ServerInfo};

/// CLI 场景下预设租户在映射中没有域名时使用的后缀
pub const CLI_FALLBACK_DOMAIN_SUFFIX: &str = "tenancy.local";

/// 租户绑定来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BindingSource {
    /// 预设租户 ID（CLI / 自动化）
    Preset,
    /// Host 请求头
    Domain,
}

/// 请求绑定的租户
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantBinding {
    pub tenant_id: String,
    /// 请求所用域名（CLI 场景为主域名或回退域名）
    pub domain: String,
    pub source: BindingSource,
}

/// 数据库隔离状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseIsolation {
    pub tenant_id: String,
    pub table_prefix: String,
}

/// 存储隔离状态
#[derive(Debug)]
pub struct StorageIsolation {
    pub tenant_id: String,
    pub dir: PathBuf,
    pub(crate) url: OnceCell<Option<String>>,
}

/// 写保护设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteProtection {
    pub disallow_file_edit: bool,
    pub disallow_file_mods: bool,
    pub debug_log: bool,
    pub debug_display: bool,
}

impl WriteProtection {
    /// Web 请求上的租户默认值
    pub fn web() -> Self {
        Self {
            disallow_file_edit: true,
            disallow_file_mods: true,
            debug_log: false,
            debug_display: false,
        }
    }

    /// 自动化场景：允许文件修改，调试日志写文件但不显示
    pub fn automation() -> Self {
        Self {
            disallow_file_edit: true,
            disallow_file_mods: false,
            debug_log: true,
            debug_display: false,
        }
    }
}

/// 单个请求的上下文
pub struct RequestContext {
    input: RequestInput,
    resolver: PathResolver,
    store: Arc<dyn MappingStore>,
    host_uploads: Box<dyn UploadArea>,

    server: OnceCell<ServerInfo>,
    mappings: OnceCell<TenantMappings>,

    pub(crate) binding: OnceCell<TenantBinding>,
    pub(crate) database: OnceCell<DatabaseIsolation>,
    pub(crate) original_prefix: OnceCell<String>,
    pub(crate) storage: OnceCell<StorageIsolation>,
    pub(crate) write_protection: OnceCell<WriteProtection>,
    pub(crate) bootstrapped: Cell<bool>,

    storage_dir_checked: Cell<bool>,
    upload_guard: ReentrancyFlag,
    notices: RefCell<Vec<OperatorNotice>>,
}

impl RequestContext {
    pub fn new(input: RequestInput, host: HostConfig, store: Arc<dyn MappingStore>) -> Self {
        let host_uploads = Box::new(SharedUploads::new(&host));
        Self {
            input,
            resolver: PathResolver::new(host),
            store,
            host_uploads,
            server: OnceCell::new(),
            mappings: OnceCell::new(),
            binding: OnceCell::new(),
            database: OnceCell::new(),
            original_prefix: OnceCell::new(),
            storage: OnceCell::new(),
            write_protection: OnceCell::new(),
            bootstrapped: Cell::new(false),
            storage_dir_checked: Cell::new(false),
            upload_guard: ReentrancyFlag::new(),
            notices: RefCell::new(Vec::new()),
        }
    }

    /// 替换宿主默认上传目录解析
    pub fn with_host_uploads(mut self, uploads: Box<dyn UploadArea>) -> Self {
        self.host_uploads = uploads;
        self
    }

    pub fn input(&self) -> &RequestInput {
        &self.input
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn host_config(&self) -> &HostConfig {
        self.resolver.host()
    }

    pub fn store(&self) -> &dyn MappingStore {
        self.store.as_ref()
    }

    /// 服务器信息，每个请求只计算一次
    pub fn server_info(&self) -> &ServerInfo {
        self.server.get_or_init(|| ServerInfo::from_input(&self.input))
    }

    /// 映射表，每个请求只读取一次
    pub fn mappings(&self) -> &TenantMappings {
        self.mappings.get_or_init(|| self.store.load())
    }

    pub fn binding(&self) -> Option<&TenantBinding> {
        self.binding.get()
    }

    pub fn database_isolation(&self) -> Option<&DatabaseIsolation> {
        self.database.get()
    }

    pub fn storage_isolation(&self) -> Option<&StorageIsolation> {
        self.storage.get()
    }

    pub fn write_protection(&self) -> Option<WriteProtection> {
        self.write_protection.get().copied()
    }

    /// 启动流程是否已在本请求上运行
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.get()
    }

    /// 预设租户的 CLI 域名：映射中的主域名，否则 `{id}.tenancy.local`
    pub fn cli_domain(&self, tenant_id: &str) -> String {
        self.mappings()
            .get(tenant_id)
            .and_then(|domains| domains.first())
            .filter(|domain| !domain.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("{tenant_id}.{CLI_FALLBACK_DOMAIN_SUFFIX}"))
    }

    /// 请求期间记录的通知
    pub fn notices(&self) -> Vec<OperatorNotice> {
        self.notices.borrow().clone()
    }

    pub(crate) fn record_notice(&self, notice: OperatorNotice) {
        notice.log();
        let mut notices = self.notices.borrow_mut();
        if !notices.contains(&notice) {
            notices.push(notice);
        }
    }

    /// 租户存储目录不存在时创建，每个请求最多尝试一次
    pub(crate) fn ensure_storage_dir(&self, storage: &StorageIsolation) -> bool {
        if self.storage_dir_checked.replace(true) {
            return storage.dir.is_dir();
        }
        if storage.dir.is_dir() {
            return true;
        }
        match ensure_dir(&storage.dir) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    tenant_id = %storage.tenant_id,
                    path = %storage.dir.display(),
                    "Failed to create tenant storage root: {e}"
                );
                self.record_notice(OperatorNotice::StorageRootUnavailable {
                    tenant_id: storage.tenant_id.clone(),
                    path: storage.dir.clone(),
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    /// 计算并缓存租户存储 URL；调用方负责持有上传目录重入标志
    fn storage_url_unguarded(&self, storage: &StorageIsolation) -> Option<String> {
        if let Some(url) = storage.url.get() {
            return url.clone();
        }
        let url = self
            .resolver
            .tenant_storage_url(&storage.tenant_id, self);
        let _ = storage.url.set(url.clone());
        url
    }

    /// 租户存储 URL（未隔离时为 `None`）
    pub(crate) fn storage_url(&self, storage: &StorageIsolation) -> Option<String> {
        // 已处于上传目录解析内部时不再重复进入
        let _guard = self.upload_guard.enter();
        self.storage_url_unguarded(storage)
    }
}

impl UploadArea for RequestContext {
    /// 租户请求上返回租户存储子树；在解析过程中再次进入时返回宿主默认值
    fn upload_dir(&self) -> UploadDir {
        let host_dir = self.host_uploads.upload_dir();

        let Some(storage) = self.storage.get() else {
            return host_dir;
        };

        let Some(_guard) = self.upload_guard.enter() else {
            return host_dir;
        };

        self.ensure_storage_dir(storage);
        let baseurl = self.storage_url_unguarded(storage).unwrap_or_default();
        host_dir.rebase(storage.dir.clone(), baseurl)
    }
}
