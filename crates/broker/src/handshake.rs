//! 跨域管理员登录握手
//!
//! 租户站点收到带 `token` 参数的后台或登录页请求时兑换令牌：
//! 校验通过则以租户库中 ID 最小的管理员登录并重定向到不含令牌的后台地址，
//! 失败则保存一次性提示并重定向到登录页。

use std::sync::Arc;
use strum::Display;
use tracing::{error, info, warn};

use tenancy_common::config::HostConfig;

use crate::broker::AdminTokenBroker;
use crate::directory::{AdminAccount, AdminDirectory};
use crate::notice::NoticeStore;
use crate::session::{Session, SessionIssuer};

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired admin access token.";
pub const TENANT_UNKNOWN_MESSAGE: &str = "Tenant identification failed.";
pub const NO_ADMIN_MESSAGE: &str = "No admin user found for tenant access.";

/// 登录页错误标记参数
pub const TOKEN_ERROR_PARAM: &str = "token_error";

/// 请求所在的页面
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AdminSurface {
    Admin,
    Login,
    #[default]
    Other,
}

impl AdminSurface {
    /// 按请求路径判断
    pub fn classify(path: &str, host: &HostConfig) -> Self {
        let admin_root = host.admin_path.trim_end_matches('/');
        if path == host.login_path {
            Self::Login
        } else if !admin_root.is_empty()
            && (path == admin_root || path.starts_with(&format!("{admin_root}/")))
        {
            Self::Admin
        } else {
            Self::Other
        }
    }
}

/// 握手输入，全部来自已经完成租户解析的请求
#[derive(Debug, Clone, Default)]
pub struct HandshakeRequest<'a> {
    pub surface: AdminSurface,
    pub is_tenant: bool,
    pub tenant_id: &'a str,
    pub host: &'a str,
    pub token: Option<&'a str>,
    pub hash: Option<&'a str>,
    /// 当前租户的表前缀
    pub table_prefix: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// 不需要握手，请求照常处理
    NotApplicable,
    LoggedIn {
        account: AdminAccount,
        session: Session,
        redirect: String,
    },
    Rejected {
        redirect: String,
    },
}

pub struct AdminHandshake {
    broker: AdminTokenBroker,
    directory: Arc<dyn AdminDirectory>,
    sessions: Arc<dyn SessionIssuer>,
    notices: Arc<NoticeStore>,
    scheme: &'static str,
    admin_path: String,
    login_path: String,
}

impl AdminHandshake {
    pub fn new(
        broker: AdminTokenBroker,
        directory: Arc<dyn AdminDirectory>,
        sessions: Arc<dyn SessionIssuer>,
        notices: Arc<NoticeStore>,
        host: &HostConfig,
    ) -> Self {
        Self {
            broker,
            directory,
            sessions,
            notices,
            scheme: host.scheme(),
            admin_path: host.admin_path.clone(),
            login_path: host.login_path.clone(),
        }
    }

    pub fn broker(&self) -> &AdminTokenBroker {
        &self.broker
    }

    pub fn notices(&self) -> &NoticeStore {
        &self.notices
    }

    pub fn sessions(&self) -> &Arc<dyn SessionIssuer> {
        &self.sessions
    }

    /// 兑换令牌
    pub async fn redeem(&self, req: &HandshakeRequest<'_>, now: i64) -> HandshakeOutcome {
        let on_admin_surface = matches!(req.surface, AdminSurface::Admin | AdminSurface::Login);
        let token = match req.token {
            Some(token) if !token.is_empty() => token,
            _ => return HandshakeOutcome::NotApplicable,
        };
        if !on_admin_surface || !req.is_tenant {
            return HandshakeOutcome::NotApplicable;
        }

        if req.tenant_id.is_empty() || req.host.is_empty() {
            return self.reject(req, TENANT_UNKNOWN_MESSAGE);
        }

        if let Err(reason) = self
            .broker
            .validate_at(token, req.hash, req.host, req.tenant_id, now)
        {
            warn!(
                tenant_id = %req.tenant_id,
                host = %req.host,
                %reason,
                "Admin token rejected"
            );
            return self.reject(req, INVALID_TOKEN_MESSAGE);
        }

        let account = match self.directory.lowest_admin(req.table_prefix).await {
            Ok(Some(account)) => account,
            Ok(None) => return self.reject(req, NO_ADMIN_MESSAGE),
            Err(e) => {
                error!(tenant_id = %req.tenant_id, "Admin lookup failed: {e}");
                return self.reject(req, NO_ADMIN_MESSAGE);
            }
        };

        let session = match self.sessions.issue(req.tenant_id, &account, now).await {
            Ok(session) => session,
            Err(e) => {
                error!(tenant_id = %req.tenant_id, "Failed to establish admin session: {e}");
                return self.reject(req, INVALID_TOKEN_MESSAGE);
            }
        };

        info!(
            tenant_id = %req.tenant_id,
            user_id = account.id,
            "Admin handshake succeeded"
        );
        HandshakeOutcome::LoggedIn {
            account,
            session,
            redirect: format!("{}://{}{}", self.scheme, req.host, self.admin_path),
        }
    }

    /// 取出登录页要显示的一次性提示
    pub fn take_notice(&self, tenant_id: &str) -> Option<String> {
        self.notices.take(tenant_id)
    }

    fn reject(&self, req: &HandshakeRequest<'_>, message: &str) -> HandshakeOutcome {
        self.notices.put(req.tenant_id, message);
        HandshakeOutcome::Rejected {
            redirect: format!(
                "{}://{}{}?{}=1",
                self.scheme, req.host, self.login_path, TOKEN_ERROR_PARAM
            ),
        }
    }
}
