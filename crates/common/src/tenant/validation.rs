//! 租户 ID 与域名校验
//!
//! 所有校验函数都是纯函数：不 panic、不返回错误，只返回 `bool`。
//! 调用方在每个使用点都应重新校验，即使上游已经校验过。

use once_cell::sync::Lazy;
use regex::Regex;

/// 租户 ID 长度
pub const TENANT_ID_LEN: usize = 6;

/// 租户 ID 允许的字符集
pub const TENANT_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// 保留的租户 ID
///
/// 屏蔽运维敏感名称与低熵组合
pub const RESERVED_TENANT_IDS: &[&str] = &[
    // admin / root / test / guest / user 变体
    "admin1", "admin2", "admin3", "admin4", "admin5",
    "root01", "root02", "root03", "root04", "root05",
    "test01", "test02", "test03", "test04", "test05",
    "guest1", "guest2", "guest3", "guest4", "guest5",
    "user01", "user02", "user03", "user04", "user05",
    // 系统关键字
    "public", "privat", "system", "config", "backup", "upload", "assets",
    // 重复字符
    "000000", "111111", "222222", "333333", "444444",
    "555555", "666666", "777777", "888888", "999999",
    "aaaaaa", "bbbbbb", "cccccc", "dddddd", "eeeeee",
    "ffffff", "gggggg", "hhhhhh", "iiiiii", "jjjjjj",
    // 常见序列
    "123456", "654321", "abc123", "123abc", "qwerty",
];

const DOMAIN_MAX_LEN: usize = 253;
const DOMAIN_MIN_LEN: usize = 4;
const LABEL_MAX_LEN: usize = 63;

static DOMAIN_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9\-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9\-]{0,61}[a-z0-9])?)*$")
        .expect("domain regex is valid")
});

/// 不可路由 / 内网地址模式
static NON_ROUTABLE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^[0-9]+$",
        r"^[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+$",
        r"^localhost$",
        r"\.localhost$",
        r"^127\.0\.0\.1$",
        r"^192\.168\.",
        r"^10\.",
        r"^172\.(1[6-9]|2[0-9]|3[0-1])\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("non-routable regex is valid"))
    .collect()
});

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

/// 校验租户 ID
///
/// 恰好 6 个 `[a-z0-9]` 字符，且不在保留列表中。不做 trim，
/// 带空白或控制字符的输入直接判为无效。
pub fn validate_id(id: &str) -> bool {
    id.len() == TENANT_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        && !RESERVED_TENANT_IDS.contains(&id)
}

/// 校验域名
///
/// 语法检查（标签 ≤ 63、总长 ≤ 253、至少两个标签、TLD 长度 2..=63 且非纯数字）
/// 加上不可路由地址的拒绝列表。
pub fn validate_domain(domain: &str) -> bool {
    let domain = strip_control_chars(domain).trim().to_ascii_lowercase();

    if domain.len() > DOMAIN_MAX_LEN || domain.len() < DOMAIN_MIN_LEN {
        return false;
    }

    if !DOMAIN_SYNTAX.is_match(&domain) {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty() || l.len() > LABEL_MAX_LEN) {
        return false;
    }

    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || tld.len() > LABEL_MAX_LEN || tld.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    !NON_ROUTABLE.iter().any(|pattern| pattern.is_match(&domain))
}

/// 去除 NUL 与 ASCII 控制字符
pub fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !(c.is_ascii_control()))
        .collect()
}

/// 文本字段清洗：去控制字符、去 HTML 标签、trim
pub fn sanitize_text_field(input: &str) -> String {
    let stripped = strip_control_chars(input);
    HTML_TAG.replace_all(&stripped, "").trim().to_string()
}
