//! 登录会话
//!
//! 握手成功后为管理员签发会话。内存实现供网关与测试使用。

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::directory::AdminAccount;
use crate::error::BrokerError;

/// 会话 ID 长度
const SESSION_ID_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub tenant_id: String,
    pub account: AdminAccount,
    pub expires: i64,
}

#[async_trait]
pub trait SessionIssuer: Send + Sync {
    /// 为账户签发会话，登录标记为“记住我”
    async fn issue(
        &self,
        tenant_id: &str,
        account: &AdminAccount,
        now: i64,
    ) -> Result<Session, BrokerError>;

    /// 查找未过期的会话
    async fn lookup(&self, session_id: &str, now: i64) -> Option<Session>;
}

#[derive(Debug)]
pub struct MemorySessionIssuer {
    ttl_secs: i64,
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionIssuer {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX / 2),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// 清理过期会话
    pub async fn purge_expired(&self, now: i64) -> usize {
        purge(&mut *self.sessions.write().await, now)
    }
}

fn purge(sessions: &mut HashMap<String, Session>, now: i64) -> usize {
    let before = sessions.len();
    sessions.retain(|_, s| s.expires > now);
    before - sessions.len()
}

#[async_trait]
impl SessionIssuer for MemorySessionIssuer {
    async fn issue(
        &self,
        tenant_id: &str,
        account: &AdminAccount,
        now: i64,
    ) -> Result<Session, BrokerError> {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        let session = Session {
            id: id.clone(),
            tenant_id: tenant_id.to_string(),
            account: account.clone(),
            expires: now + self.ttl_secs,
        };
        // 签发时顺带清理过期会话，内存占用只随活跃会话增长
        let mut sessions = self.sessions.write().await;
        let purged = purge(&mut sessions, now);
        sessions.insert(id, session.clone());
        drop(sessions);
        info!(tenant_id, user_id = account.id, purged, "Admin session issued");
        Ok(session)
    }

    async fn lookup(&self, session_id: &str, now: i64) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .filter(|s| s.expires > now)
            .cloned()
    }
}
