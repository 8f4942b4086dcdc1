//! 管理员令牌代理
//!
//! 主站为租户生成一次性风格的管理员登录链接，租户站点在请求时校验令牌。
//! 令牌由所有租户共享，域名哈希把每个链接绑定到具体的租户域名。

use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use tenancy_common::config::{HostConfig, TokenConfig};
use tenancy_common::storage::PathResolver;
use tenancy_common::{Tenant, TenancyConfig, validate_id};

use crate::error::BrokerError;
use crate::hash::{constant_time_eq, domain_hash};
use crate::store::{TokenRecord, TokenState, TokenStore};

/// 令牌被拒绝的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("token is empty")]
    EmptyToken,
    #[error("no valid token on record")]
    NoActiveToken,
    #[error("token mismatch")]
    TokenMismatch,
    #[error("domain hash is required")]
    MissingHash,
    #[error("request host or tenant is unknown")]
    MissingBinding,
    #[error("domain hash mismatch")]
    HashMismatch,
}

#[derive(Debug, Clone)]
pub struct AdminTokenBroker {
    store: TokenStore,
    install_secret: String,
    ttl_secs: i64,
    require_hash: bool,
    scheme: &'static str,
    admin_path: String,
}

impl AdminTokenBroker {
    pub fn new(
        store: TokenStore,
        install_secret: impl Into<String>,
        token: &TokenConfig,
        host: &HostConfig,
    ) -> Self {
        Self {
            store,
            install_secret: install_secret.into(),
            ttl_secs: i64::try_from(token.ttl_secs).unwrap_or(i64::MAX / 2),
            require_hash: token.require_hash,
            scheme: host.scheme(),
            admin_path: host.admin_path.clone(),
        }
    }

    /// 从全局配置构建，令牌文件位于存储根目录
    pub fn from_config(config: &TenancyConfig, resolver: &PathResolver) -> Self {
        let store = TokenStore::new(resolver.config_file_path(&config.token.file_name));
        Self::new(store, config.install_secret.clone(), &config.token, &config.host)
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn token_state(&self) -> TokenState {
        self.store.state_at(Utc::now().timestamp())
    }

    /// 当前未过期的令牌
    pub fn current_token(&self, now: i64) -> Option<TokenRecord> {
        self.store.current_at(now)
    }

    /// 无条件生成新令牌
    pub fn issue(&self, now: i64) -> Result<TokenRecord, BrokerError> {
        self.issue_with_rng(now, &mut rand::thread_rng())
    }

    pub fn issue_with_rng<R: Rng + ?Sized>(
        &self,
        now: i64,
        rng: &mut R,
    ) -> Result<TokenRecord, BrokerError> {
        self.store.issue_at(now, self.ttl_secs, rng)
    }

    /// 用于生成链接的令牌：复用未过期的，否则重新生成
    pub fn token_for_link(&self, now: i64) -> Result<TokenRecord, BrokerError> {
        match self.current_token(now) {
            Some(record) => Ok(record),
            None => self.issue(now),
        }
    }

    /// 租户管理后台登录链接
    ///
    /// `{scheme}://{primary_domain}{admin_path}?token=...&hash=...`
    pub fn build_admin_url(&self, tenant: &Tenant) -> Result<String, BrokerError> {
        self.build_admin_url_at(tenant, Utc::now().timestamp())
    }

    pub fn build_admin_url_at(&self, tenant: &Tenant, now: i64) -> Result<String, BrokerError> {
        if !validate_id(tenant.id()) {
            return Err(BrokerError::InvalidTenantId(tenant.id().to_string()));
        }
        let domain = tenant
            .primary_domain()
            .ok_or_else(|| BrokerError::NoPrimaryDomain(tenant.id().to_string()))?;

        let record = self.token_for_link(now)?;
        let hash = domain_hash(domain, tenant.id(), &self.install_secret);
        debug!(tenant_id = %tenant.id(), domain, "Built admin access link");

        Ok(format!(
            "{}://{}{}?token={}&hash={}",
            self.scheme, domain, self.admin_path, record.token, hash
        ))
    }

    /// 校验令牌与可选的域名哈希
    pub fn validate(
        &self,
        token: &str,
        hash: Option<&str>,
        request_host: &str,
        tenant_id: &str,
    ) -> Result<(), TokenRejection> {
        self.validate_at(token, hash, request_host, tenant_id, Utc::now().timestamp())
    }

    pub fn validate_at(
        &self,
        token: &str,
        hash: Option<&str>,
        request_host: &str,
        tenant_id: &str,
        now: i64,
    ) -> Result<(), TokenRejection> {
        if token.is_empty() {
            return Err(TokenRejection::EmptyToken);
        }
        let record = self
            .store
            .current_at(now)
            .ok_or(TokenRejection::NoActiveToken)?;
        if !constant_time_eq(token, &record.token) {
            return Err(TokenRejection::TokenMismatch);
        }

        match hash.filter(|h| !h.is_empty()) {
            Some(provided) => {
                if request_host.is_empty() || tenant_id.is_empty() {
                    return Err(TokenRejection::MissingBinding);
                }
                let expected = domain_hash(request_host, tenant_id, &self.install_secret);
                if !constant_time_eq(&provided.to_ascii_lowercase(), &expected) {
                    warn!(tenant_id, host = request_host, "Admin token hash mismatch");
                    return Err(TokenRejection::HashMismatch);
                }
            }
            None if self.require_hash => return Err(TokenRejection::MissingHash),
            None => {}
        }
        Ok(())
    }
}
