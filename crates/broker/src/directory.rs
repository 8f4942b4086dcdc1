//! 租户管理员目录
//!
//! 握手时为租户站点查找登录身份：角色为 administrator、ID 最小的用户。

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::error::BrokerError;

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid table prefix regex"));

/// 握手登录的账户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub id: i64,
    pub login: String,
}

/// 管理员查询接口
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// 在给定表前缀下查找 ID 最小的管理员
    async fn lowest_admin(&self, table_prefix: &str) -> Result<Option<AdminAccount>, BrokerError>;
}

/// 基于站点 SQLite 数据库的管理员目录
///
/// 用户表 `{prefix}users`，角色存放在 `{prefix}usermeta` 的
/// `{prefix}capabilities` 序列化值里。
#[derive(Debug, Clone)]
pub struct SqliteAdminDirectory {
    pool: SqlitePool,
}

impl SqliteAdminDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminDirectory for SqliteAdminDirectory {
    async fn lowest_admin(&self, table_prefix: &str) -> Result<Option<AdminAccount>, BrokerError> {
        // 前缀直接拼进 SQL，只允许安全字符；租户前缀可能以数字开头，表名必须加引号
        if !PREFIX_RE.is_match(table_prefix) {
            return Err(BrokerError::InvalidPrefix(table_prefix.to_string()));
        }

        let sql = format!(
            "SELECT u.ID, u.user_login FROM \"{p}users\" u \
             JOIN \"{p}usermeta\" m ON m.user_id = u.ID \
             WHERE m.meta_key = ? AND m.meta_value LIKE '%\"administrator\"%' \
             ORDER BY u.ID ASC LIMIT 1",
            p = table_prefix
        );
        let row = sqlx::query_as::<_, (i64, String)>(&sql)
            .bind(format!("{table_prefix}capabilities"))
            .fetch_optional(&self.pool)
            .await?;

        debug!(table_prefix, found = row.is_some(), "Looked up lowest administrator");
        Ok(row.map(|(id, login)| AdminAccount { id, login }))
    }
}
