//! 请求输入与服务器信息

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tenancy_common::tenant::validation::{sanitize_text_field, validate_domain};

/// 内核消费的原始请求输入（均不可信）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInput {
    /// 原始 Host 请求头
    pub host_header: Option<String>,
    /// HTTPS 指示值（`on` / `1` / `true`）
    pub https: Option<String>,
    /// 预设租户 ID（CLI / 自动化场景），优先于域名识别
    pub preset_tenant_id: Option<String>,
}

impl RequestInput {
    pub fn web(host_header: impl Into<String>) -> Self {
        Self {
            host_header: Some(host_header.into()),
            ..Default::default()
        }
    }

    pub fn preset(tenant_id: impl Into<String>) -> Self {
        Self {
            preset_tenant_id: Some(tenant_id.into()),
            ..Default::default()
        }
    }

    pub fn with_https(mut self, indicator: impl Into<String>) -> Self {
        self.https = Some(indicator.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

/// 经过清洗与校验的服务器信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// 合法域名，校验失败时为空
    pub host: String,
    pub protocol: Protocol,
}

impl ServerInfo {
    pub fn from_input(input: &RequestInput) -> Self {
        let host = input
            .host_header
            .as_deref()
            .map(sanitize_text_field)
            .filter(|host| validate_domain(host))
            .unwrap_or_default();

        let protocol = match input.https.as_deref().map(sanitize_text_field) {
            Some(value) if value == "on" || value == "1" || value.eq_ignore_ascii_case("true") => {
                Protocol::Https
            }
            _ => Protocol::Http,
        };

        Self { host, protocol }
    }

    pub fn has_host(&self) -> bool {
        !self.host.is_empty()
    }

    /// `{protocol}://{host}`，无合法 host 时为 `None`
    pub fn site_url(&self) -> Option<String> {
        self.has_host()
            .then(|| format!("{}://{}", self.protocol, self.host))
    }

    /// `{site_url}/wp-content`
    pub fn content_url(&self) -> Option<String> {
        self.site_url().map(|site| format!("{site}/wp-content"))
    }
}
