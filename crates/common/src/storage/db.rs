//! 站点数据库句柄
//!
//! 提供基于 sqlx 的连接池以及可切换的表前缀。租户请求在隔离阶段把前缀
//! 改为 `{tenant_id}_`，之后所有表名都经由 `table()` 拼接。

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// 可切换表前缀的数据库句柄
pub trait PrefixHandle {
    /// 当前生效的表前缀
    fn prefix(&self) -> &str;

    /// 设置表前缀
    fn set_prefix(&mut self, prefix: &str);

    /// 带前缀的表名
    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }
}

/// 不持有连接的表前缀状态（CLI 与测试使用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePrefix(String);

impl TablePrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }
}

impl PrefixHandle for TablePrefix {
    fn prefix(&self) -> &str {
        &self.0
    }

    fn set_prefix(&mut self, prefix: &str) {
        self.0 = prefix.to_string();
    }
}

/// 站点数据库
///
/// 克隆开销很小（连接池内部为 `Arc`），每个请求持有一个独立副本，
/// 前缀修改不会影响其他请求。
#[derive(Clone, Debug)]
pub struct SiteDatabase {
    pool: SqlitePool,
    prefix: String,
}

impl SiteDatabase {
    /// 连接站点数据库
    ///
    /// # Arguments
    /// * `url` - sqlx SQLite 连接串，如 `sqlite:/var/lib/site.db`
    /// * `default_prefix` - 宿主默认表前缀
    pub async fn connect(url: &str, default_prefix: &str) -> Result<Self> {
        // 创建连接选项并启用 WAL 模式
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        Ok(Self::with_pool(pool, default_prefix))
    }

    pub fn with_pool(pool: SqlitePool, default_prefix: &str) -> Self {
        Self {
            pool,
            prefix: default_prefix.to_string(),
        }
    }

    /// 获取数据库连接池
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 执行 SQL 语句并返回影响的行数
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

impl PrefixHandle for SiteDatabase {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
    }
}
