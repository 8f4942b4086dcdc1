//! 租户注册表（写路径）
//!
//! 映射存储之上的运维写操作：创建、更新、删除租户，并维护
//! "一个域名只属于一个租户" 的约束。

use rand::Rng;
use tracing::{error, info, warn};

use super::error::{DomainConflict, TenantError};
use super::model::{Tenant, generate_id};
use super::validation::{sanitize_text_field, validate_domain, validate_id};
use crate::storage::mapping::{MappingStore, TenantMappings};
use crate::storage::paths::PathResolver;
use crate::util::fs::{ensure_dir, remove_dir_recursive};

/// 生成租户 ID 的最大尝试次数
const MAX_ID_ATTEMPTS: usize = 100;

/// 超过该长度的输入在错误信息中被截断
const DISPLAY_MAX_LEN: usize = 253;
const DISPLAY_TRUNCATED_LEN: usize = 50;

/// 租户注册表
pub struct TenantRegistry<S: MappingStore> {
    store: S,
    resolver: PathResolver,
}

impl<S: MappingStore> TenantRegistry<S> {
    pub fn new(store: S, resolver: PathResolver) -> Self {
        Self { store, resolver }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// 当前全部租户（按 ID 排序）
    pub fn list(&self) -> Vec<Tenant> {
        self.store
            .load()
            .iter()
            .map(|(id, domains)| Tenant::from_mapping(id, domains.to_vec()))
            .collect()
    }

    pub fn get(&self, tenant_id: &str) -> Option<Tenant> {
        if !validate_id(tenant_id) {
            return None;
        }
        self.store
            .load()
            .get(tenant_id)
            .map(|domains| Tenant::from_mapping(tenant_id, domains.to_vec()))
    }

    /// 创建租户
    pub fn create(&self, domains: &[String]) -> Result<Tenant, TenantError> {
        self.create_with_rng(domains, &mut rand::thread_rng())
    }

    /// 使用指定随机源创建租户
    pub fn create_with_rng<R: Rng + ?Sized>(
        &self,
        domains: &[String],
        rng: &mut R,
    ) -> Result<Tenant, TenantError> {
        let domains = prepare_domains(domains)?;
        let mut mappings = self.store.load();
        check_unique(&mappings, &domains, None)?;

        let tenant_id = allocate_id(&mappings, rng)?;
        mappings.insert(tenant_id.clone(), domains.clone());
        self.store.save(&mappings)?;

        self.provision(&tenant_id);
        info!(tenant_id = %tenant_id, domains = ?domains, "Tenant created");

        Ok(Tenant::new(tenant_id, domains))
    }

    /// 替换租户的域名列表
    pub fn update(&self, tenant_id: &str, domains: &[String]) -> Result<Tenant, TenantError> {
        if !validate_id(tenant_id) {
            return Err(TenantError::InvalidId(display_input(tenant_id)));
        }

        let domains = prepare_domains(domains)?;
        let mut mappings = self.store.load();
        if !mappings.contains_tenant(tenant_id) {
            return Err(TenantError::NotFound(tenant_id.to_string()));
        }
        check_unique(&mappings, &domains, Some(tenant_id))?;

        mappings.insert(tenant_id, domains.clone());
        self.store.save(&mappings)?;

        info!(tenant_id = %tenant_id, domains = ?domains, "Tenant updated");
        Ok(Tenant::from_mapping(tenant_id, domains))
    }

    /// 删除租户及其上传目录 `{base}/{id}/uploads`
    pub fn delete(&self, tenant_id: &str) -> Result<(), TenantError> {
        if !validate_id(tenant_id) {
            return Err(TenantError::InvalidId(display_input(tenant_id)));
        }

        let mut mappings = self.store.load();
        if mappings.remove(tenant_id).is_none() {
            return Err(TenantError::NotFound(tenant_id.to_string()));
        }
        self.store.save(&mappings)?;

        if let Some(dir) = self.resolver.tenant_storage_path(tenant_id)
            && let Err(e) = remove_dir_recursive(&dir)
        {
            warn!(tenant_id = %tenant_id, "Failed to remove tenant storage: {e}");
        }

        info!(tenant_id = %tenant_id, "Tenant deleted");
        Ok(())
    }

    /// 创建租户存储目录，失败只记录日志
    fn provision(&self, tenant_id: &str) {
        let Some(path) = self.resolver.tenant_storage_path(tenant_id) else {
            return;
        };
        if let Err(e) = ensure_dir(&path) {
            error!(
                tenant_id = %tenant_id,
                path = %path.display(),
                "Failed to provision tenant storage: {e}"
            );
        }
    }
}

/// 清洗、去重、校验域名输入
fn prepare_domains(raw: &[String]) -> Result<Vec<String>, TenantError> {
    let mut domains: Vec<String> = Vec::new();
    let mut invalid = Vec::new();

    for input in raw {
        let domain = sanitize_text_field(input).to_ascii_lowercase();
        if domain.is_empty() {
            continue;
        }
        if !validate_domain(&domain) {
            invalid.push(display_input(input.trim()));
            continue;
        }
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }

    if !invalid.is_empty() {
        return Err(TenantError::InvalidDomains { domains: invalid });
    }
    if domains.is_empty() {
        return Err(TenantError::NoDomains);
    }
    Ok(domains)
}

/// 跨租户的域名唯一性检查（大小写不敏感），`exclude` 为正在更新的租户
fn check_unique(
    mappings: &TenantMappings,
    domains: &[String],
    exclude: Option<&str>,
) -> Result<(), TenantError> {
    let conflicts: Vec<DomainConflict> = domains
        .iter()
        .filter_map(|domain| {
            mappings
                .iter()
                .filter(|(id, _)| Some(*id) != exclude)
                .find(|(_, owned)| owned.iter().any(|o| o.eq_ignore_ascii_case(domain)))
                .map(|(id, _)| DomainConflict {
                    domain: domain.clone(),
                    tenant_id: id.to_string(),
                })
        })
        .collect();

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(TenantError::DuplicateDomain { conflicts })
    }
}

fn allocate_id<R: Rng + ?Sized>(mappings: &TenantMappings, rng: &mut R) -> Result<String, TenantError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = generate_id(rng);
        if validate_id(&candidate) && !mappings.contains_tenant(&candidate) {
            return Ok(candidate);
        }
    }
    Err(TenantError::IdExhausted)
}

/// 错误信息中展示的输入，过长时截断
fn display_input(input: &str) -> String {
    if input.chars().count() > DISPLAY_MAX_LEN {
        let head: String = input.chars().take(DISPLAY_TRUNCATED_LEN).collect();
        format!("{head}...")
    } else {
        input.to_string()
    }
}
