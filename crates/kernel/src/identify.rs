//! 租户识别
//!
//! 按映射表迭代顺序线性扫描，大小写敏感的精确匹配，第一个命中者生效。
//! 不做任何规范化，调用方负责提供已清洗的 host。

use tenancy_common::storage::TenantMappings;

/// 根据域名查找所属租户，未命中返回 `None`（共享站点）
pub fn identify<'a>(domain: &str, mappings: &'a TenantMappings) -> Option<&'a str> {
    if domain.is_empty() {
        return None;
    }
    mappings
        .iter()
        .find(|(_, domains)| domains.iter().any(|entry| entry == domain))
        .map(|(tenant_id, _)| tenant_id)
}
