//! 租户核心数据结构
//!
//! 定义租户实体的核心数据结构和基础方法

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::validation::{TENANT_ID_CHARSET, TENANT_ID_LEN, validate_domain, validate_id};

/// 租户状态
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TenantStatus {
    #[default]
    Active,
    Inactive,
}

/// 租户结构体
///
/// 映射文件是唯一的持久化来源，`Tenant` 只是它的一个投影：
/// - `id`: 6 位租户 ID，创建后不可变
/// - `domains`: 有序域名列表，第一个是主域名
/// - `created_at`: 仅在本进程内创建时有值，从映射文件读出的为 `None`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    id: String,
    domains: Vec<String>,
    #[serde(default)]
    status: TenantStatus,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    configuration: BTreeMap<String, serde_json::Value>,
}

impl Tenant {
    /// 创建新租户，`created_at` 取当前时间
    pub fn new(id: impl Into<String>, domains: Vec<String>) -> Self {
        Self {
            id: id.into(),
            domains,
            status: TenantStatus::Active,
            created_at: Some(Utc::now().timestamp()),
            configuration: BTreeMap::new(),
        }
    }

    /// 从映射条目构建只读投影
    pub fn from_mapping(id: impl Into<String>, domains: Vec<String>) -> Self {
        Self {
            id: id.into(),
            domains,
            status: TenantStatus::Active,
            created_at: None,
            configuration: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn status(&self) -> TenantStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    pub fn configuration(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.configuration
    }

    /// 替换域名列表，丢弃不合法与重复的条目
    pub fn set_domains(&mut self, domains: Vec<String>) {
        self.domains.clear();
        for domain in domains {
            self.add_domain(&domain);
        }
    }

    pub fn set_status(&mut self, status: TenantStatus) {
        self.status = status;
    }

    pub fn set_configuration(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.configuration.insert(key.into(), value);
    }

    /// 主域名（第一个域名）
    pub fn primary_domain(&self) -> Option<&str> {
        self.domains.first().map(String::as_str)
    }

    /// 列表展示用的域名（与主域名相同）
    pub fn display_domain(&self) -> Option<&str> {
        self.primary_domain()
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d == domain)
    }

    /// 添加域名，已存在或格式不合法时返回 false
    pub fn add_domain(&mut self, domain: &str) -> bool {
        if !validate_domain(domain) || self.has_domain(domain) {
            return false;
        }
        self.domains.push(domain.to_string());
        true
    }

    /// 移除域名，不存在时返回 false
    pub fn remove_domain(&mut self, domain: &str) -> bool {
        let before = self.domains.len();
        self.domains.retain(|d| d != domain);
        self.domains.len() != before
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    /// ID 合法且至少有一个域名
    pub fn is_valid(&self) -> bool {
        validate_id(&self.id) && !self.domains.is_empty()
    }

    pub fn info(&self) -> TenantSummary {
        TenantSummary {
            id: self.id.clone(),
            primary_domain: self.primary_domain().map(str::to_string),
            domain_count: self.domains.len(),
            status: self.status,
            created_at: self.created_at,
            is_active: self.is_active(),
        }
    }
}

/// 租户摘要（列表 / 管理界面展示用）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantSummary {
    pub id: String,
    pub primary_domain: Option<String>,
    pub domain_count: usize,
    pub status: TenantStatus,
    pub created_at: Option<i64>,
    pub is_active: bool,
}

/// 生成一个随机租户 ID（不保证未被占用，也不保证不在保留列表中）
pub fn generate_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..TENANT_ID_LEN)
        .map(|_| TENANT_ID_CHARSET[rng.gen_range(0..TENANT_ID_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample() -> Tenant {
        Tenant::new(
            "ab12cd",
            vec!["shop.example.com".to_string(), "www.shop.example.com".to_string()],
        )
    }

    #[test]
    fn test_tenant_creation() {
        let tenant = sample();
        assert_eq!(tenant.id(), "ab12cd");
        assert_eq!(tenant.primary_domain(), Some("shop.example.com"));
        assert_eq!(tenant.display_domain(), tenant.primary_domain());
        assert!(tenant.created_at().is_some());
        assert!(tenant.is_active());
        assert!(tenant.is_valid());
    }

    #[test]
    fn test_projection_has_no_creation_time() {
        let tenant = Tenant::from_mapping("ab12cd", vec!["shop.example.com".to_string()]);
        assert!(tenant.created_at().is_none());
    }

    #[test]
    fn test_domain_helpers() {
        let mut tenant = sample();
        assert!(!tenant.add_domain("shop.example.com"));
        assert!(!tenant.add_domain("localhost"));
        assert!(tenant.add_domain("blog.example.com"));
        assert!(tenant.has_domain("blog.example.com"));
        assert!(tenant.remove_domain("shop.example.com"));
        assert!(!tenant.remove_domain("shop.example.com"));
        assert_eq!(tenant.primary_domain(), Some("www.shop.example.com"));
    }

    #[test]
    fn test_set_domains_drops_invalid_and_duplicates() {
        let mut tenant = sample();
        tenant.set_domains(vec![
            "blog.example.com".to_string(),
            "not a domain".to_string(),
            "blog.example.com".to_string(),
            "shop.example.org".to_string(),
        ]);
        assert_eq!(tenant.domains(), ["blog.example.com", "shop.example.org"]);

        let info = tenant.info();
        assert_eq!(info.domain_count, 2);
        assert_eq!(info.primary_domain.as_deref(), Some("blog.example.com"));
        assert!(info.is_active);
    }

    #[test]
    fn test_status_round_trip_through_strings() {
        assert_eq!(TenantStatus::Inactive.to_string(), "inactive");
        assert_eq!("active".parse::<TenantStatus>().ok(), Some(TenantStatus::Active));
    }

    #[test]
    fn test_invalid_without_domains() {
        let tenant = Tenant::from_mapping("ab12cd", Vec::new());
        assert!(!tenant.is_valid());
        assert_eq!(tenant.primary_domain(), None);
    }

    #[test]
    fn test_generate_id_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let id = generate_id(&mut rng);
            assert_eq!(id.len(), TENANT_ID_LEN);
            assert!(id.bytes().all(|b| TENANT_ID_CHARSET.contains(&b)));
        }
    }
}
