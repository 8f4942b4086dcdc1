//! 域名哈希
//!
//! `hex(SHA-256(normalized_domain || tenant_id || install_secret))`，
//! 把一个令牌的兑换绑定到单个 (域名, 租户) 组合上。每次重新计算，从不持久化。

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// 域名规范化：小写，去掉一个前导 `www.`
pub fn normalize_domain(domain: &str) -> String {
    let lower = domain.trim().to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

pub fn domain_hash(domain: &str, tenant_id: &str, install_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_domain(domain).as_bytes());
    hasher.update(tenant_id.as_bytes());
    hasher.update(install_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// 常量时间比较
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
