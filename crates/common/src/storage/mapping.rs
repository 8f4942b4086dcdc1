//! 租户映射存储
//!
//! 持久化 `tenant_id -> [domain, ...]` 映射表。文件格式为 JSON，
//! 由 serde_json 解析，从不执行。
//!
//! 读取永不失败：文件缺失、不可读或损坏时返回空映射。写入采用
//! "写临时文件再替换" 的方式，并使进程内缓存失效。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::util::fs::atomic_write;

/// 进程级写入代数，任何一次成功写入都会递增
static MAPPINGS_GENERATION: AtomicU64 = AtomicU64::new(0);

/// 租户映射表
///
/// 按租户 ID 的字典序迭代；每个租户的域名顺序保持写入时的顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantMappings(BTreeMap<String, Vec<String>>);

impl TenantMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant_id: &str) -> Option<&[String]> {
        self.0.get(tenant_id).map(Vec::as_slice)
    }

    pub fn contains_tenant(&self, tenant_id: &str) -> bool {
        self.0.contains_key(tenant_id)
    }

    /// 插入或替换租户的域名列表
    pub fn insert(&mut self, tenant_id: impl Into<String>, domains: Vec<String>) -> Option<Vec<String>> {
        self.0.insert(tenant_id.into(), domains)
    }

    pub fn remove(&mut self, tenant_id: &str) -> Option<Vec<String>> {
        self.0.remove(tenant_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(id, domains)| (id.as_str(), domains.as_slice()))
    }

    pub fn tenant_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 宽松解析：丢弃值不是字符串数组的条目，以及数组中的非字符串元素
    fn from_lenient(raw: BTreeMap<String, serde_json::Value>, source: &Path) -> Self {
        let mut mappings = BTreeMap::new();
        for (tenant_id, value) in raw {
            let Some(items) = value.as_array() else {
                warn!(tenant_id = %tenant_id, file = %source.display(), "Skipping malformed mapping entry");
                continue;
            };
            let domains = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            mappings.insert(tenant_id, domains);
        }
        Self(mappings)
    }
}

impl FromIterator<(String, Vec<String>)> for TenantMappings {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 映射存储接口
///
/// 文件实现之外，可以替换为嵌入式 KV 存储而不影响调用方。
pub trait MappingStore: Send + Sync {
    /// 读取映射，失败时返回空映射
    fn load(&self) -> TenantMappings;

    /// 原子写入映射
    fn save(&self, mappings: &TenantMappings) -> Result<(), StorageError>;

    /// 后端是否已有持久化数据
    fn exists(&self) -> bool;

    /// 人类可读的位置描述（日志 / 诊断用）
    fn location(&self) -> String;
}

#[derive(Debug, Clone)]
struct CachedMappings {
    generation: u64,
    modified: Option<SystemTime>,
    len: u64,
    mappings: TenantMappings,
}

/// 基于 JSON 文件的映射存储
#[derive(Debug)]
pub struct FileMappingStore {
    path: PathBuf,
    cache: RwLock<Option<CachedMappings>>,
}

impl FileMappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cached(&self, generation: u64, modified: Option<SystemTime>, len: u64) -> Option<TenantMappings> {
        let guard = self.cache.read().ok()?;
        guard
            .as_ref()
            .filter(|c| c.generation == generation && c.modified == modified && c.len == len)
            .map(|c| c.mappings.clone())
    }

    fn store_cache(&self, entry: Option<CachedMappings>) {
        match self.cache.write() {
            Ok(mut guard) => *guard = entry,
            Err(e) => warn!("Mapping cache lock poisoned, cache not updated: {e}"),
        }
    }

    fn read_file(&self) -> Option<TenantMappings> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %self.path.display(), "Failed to read tenant mappings: {e}");
                return None;
            }
        };

        if content.trim().is_empty() {
            return Some(TenantMappings::new());
        }

        match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&content) {
            Ok(raw) => Some(TenantMappings::from_lenient(raw, &self.path)),
            Err(e) => {
                warn!(file = %self.path.display(), "Tenant mappings file is corrupt: {e}");
                None
            }
        }
    }
}

impl MappingStore for FileMappingStore {
    fn load(&self) -> TenantMappings {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(_) => {
                debug!(file = %self.path.display(), "Tenant mappings file not present");
                return TenantMappings::new();
            }
        };

        let generation = MAPPINGS_GENERATION.load(Ordering::Acquire);
        let modified = metadata.modified().ok();
        let len = metadata.len();

        if let Some(mappings) = self.cached(generation, modified, len) {
            return mappings;
        }

        let Some(mappings) = self.read_file() else {
            return TenantMappings::new();
        };

        self.store_cache(Some(CachedMappings {
            generation,
            modified,
            len,
            mappings: mappings.clone(),
        }));
        mappings
    }

    fn save(&self, mappings: &TenantMappings) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(mappings).map_err(|e| StorageError::Backend {
            backend: format!("failed to encode tenant mappings: {e}"),
        })?;

        atomic_write(&self.path, &json)?;

        MAPPINGS_GENERATION.fetch_add(1, Ordering::AcqRel);
        self.store_cache(None);

        debug!(
            file = %self.path.display(),
            tenants = mappings.len(),
            "Tenant mappings saved"
        );
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
