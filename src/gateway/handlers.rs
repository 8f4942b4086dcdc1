//! 网关请求处理器

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tenancy_broker::{AdminSurface, HandshakeOutcome, HandshakeRequest};
use tenancy_common::storage::PrefixHandle;
use tenancy_kernel::{Phase, RequestContext, RequestInput, TenantInfo, bootstrap};

use super::GatewayState;

/// 握手相关查询参数
#[derive(Debug, Default, Deserialize)]
pub(super) struct HandshakeParams {
    token: Option<String>,
    hash: Option<String>,
    token_error: Option<String>,
}

/// 引导完成后从请求上下文中取出的结果
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRequest {
    pub host: String,
    pub phase: Phase,
    pub tenant_id: Option<String>,
    pub table_prefix: String,
    pub info: Option<TenantInfo>,
}

impl ResolvedRequest {
    pub fn is_tenant(&self) -> bool {
        self.tenant_id.is_some()
    }
}

impl GatewayState {
    /// 为单个请求执行引导流程
    ///
    /// 请求上下文只在这里存活，不跨越 await。
    pub fn resolve(&self, headers: &HeaderMap) -> ResolvedRequest {
        let host = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let forwarded_https = headers
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .map(|proto| proto.eq_ignore_ascii_case("https"));
        let https = forwarded_https.unwrap_or(self.config.host.https);

        let ctx = RequestContext::new(
            RequestInput::web(host).with_https(if https { "on" } else { "off" }),
            self.config.host.clone(),
            self.store.clone(),
        );
        let mut db = self.db.clone();
        let outcome = bootstrap(&ctx, &mut db);

        ResolvedRequest {
            host: ctx.server_info().host.clone(),
            phase: outcome.phase,
            tenant_id: ctx.is_tenant().then(|| ctx.get_tenant_id()),
            table_prefix: db.prefix().to_string(),
            info: ctx.get_tenant_info(),
        }
    }

    /// 执行握手；不适用时返回 `None`
    async fn redeem(
        &self,
        resolved: &ResolvedRequest,
        surface: AdminSurface,
        params: &HandshakeParams,
        now: i64,
    ) -> Option<Response> {
        let request = HandshakeRequest {
            surface,
            is_tenant: resolved.is_tenant(),
            tenant_id: resolved.tenant_id.as_deref().unwrap_or_default(),
            host: &resolved.host,
            token: params.token.as_deref(),
            hash: params.hash.as_deref(),
            table_prefix: &resolved.table_prefix,
        };

        match self.handshake.redeem(&request, now).await {
            HandshakeOutcome::NotApplicable => None,
            HandshakeOutcome::LoggedIn {
                session, redirect, ..
            } => {
                let mut cookie = format!(
                    "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                    self.config.gateway.session_cookie,
                    session.id,
                    self.config.gateway.session_ttl_secs
                );
                if self.config.host.https {
                    cookie.push_str("; Secure");
                }
                Some(
                    (
                        StatusCode::FOUND,
                        [(header::LOCATION, redirect), (header::SET_COOKIE, cookie)],
                    )
                        .into_response(),
                )
            }
            HandshakeOutcome::Rejected { redirect } => {
                Some((StatusCode::FOUND, [(header::LOCATION, redirect)]).into_response())
            }
        }
    }
}

/// 从 Cookie 头中取出会话 ID
fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub(super) async fn admin_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(params): Query<HandshakeParams>,
) -> Response {
    let resolved = state.resolve(&headers);
    let now = Utc::now().timestamp();
    if let Some(response) = state
        .redeem(&resolved, AdminSurface::Admin, &params, now)
        .await
    {
        return response;
    }

    let session = match session_cookie(&headers, &state.config.gateway.session_cookie) {
        Some(id) => state.handshake.sessions().lookup(id, now).await,
        None => None,
    };
    match (session, resolved.tenant_id.as_deref()) {
        (Some(session), Some(tenant_id)) if session.tenant_id == tenant_id => Html(format!(
            "<h1>Dashboard</h1><p>Signed in as {} on {}</p>",
            escape_html(&session.account.login),
            escape_html(&resolved.host)
        ))
        .into_response(),
        _ => {
            debug!(host = %resolved.host, "No admin session, redirecting to login");
            (
                StatusCode::FOUND,
                [(header::LOCATION, state.config.host.login_path.clone())],
            )
                .into_response()
        }
    }
}

pub(super) async fn login_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(params): Query<HandshakeParams>,
) -> Response {
    let resolved = state.resolve(&headers);
    if let Some(response) = state
        .redeem(&resolved, AdminSurface::Login, &params, Utc::now().timestamp())
        .await
    {
        return response;
    }

    let notice = match (params.token_error.as_deref(), resolved.tenant_id.as_deref()) {
        (Some("1"), Some(tenant_id)) => state.handshake.take_notice(tenant_id),
        _ => None,
    };
    let notice_html = notice
        .map(|message| format!("<div class=\"notice notice-error\">{}</div>", escape_html(&message)))
        .unwrap_or_default();

    Html(format!("<h1>Log In</h1>{notice_html}<form method=\"post\"></form>")).into_response()
}

pub(super) async fn info_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Response {
    let resolved = state.resolve(&headers);
    match resolved.info {
        Some(info) => Json(info).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not a tenant request", "host": resolved.host })),
        )
            .into_response(),
    }
}

pub(super) async fn health_handler() -> &'static str {
    "ok"
}
