//! 令牌文件
//!
//! JSON 文件 `{ "token", "expires", "generated" }`，原子写入。
//! 所有租户共用一个令牌，过期后按需重新生成。

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::Display;
use tracing::{debug, info, warn};

use tenancy_common::util::fs::atomic_write;

use crate::error::BrokerError;

/// 令牌长度
pub const TOKEN_LEN: usize = 32;

/// 持久化的令牌记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    /// 过期时间（Unix 秒）
    pub expires: i64,
    /// 生成时间（Unix 秒）
    pub generated: i64,
}

impl TokenRecord {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires <= now
    }
}

/// 令牌状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TokenState {
    Absent,
    Valid,
    Expired,
}

/// 生成 32 位字母数字令牌
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取令牌记录，文件缺失或损坏时返回 `None`
    pub fn load(&self) -> Option<TokenRecord> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(file = %self.path.display(), "Admin token file is corrupt: {e}");
                None
            }
        }
    }

    pub fn save(&self, record: &TokenRecord) -> Result<(), BrokerError> {
        let json = serde_json::to_vec_pretty(record)?;
        atomic_write(&self.path, &json)?;
        debug!(file = %self.path.display(), expires = record.expires, "Admin token saved");
        Ok(())
    }

    pub fn state_at(&self, now: i64) -> TokenState {
        match self.load() {
            None => TokenState::Absent,
            Some(record) if record.is_expired_at(now) => TokenState::Expired,
            Some(_) => TokenState::Valid,
        }
    }

    /// 未过期的令牌
    pub fn current_at(&self, now: i64) -> Option<TokenRecord> {
        self.load().filter(|record| !record.is_expired_at(now))
    }

    /// 生成并保存新令牌
    pub fn issue_at<R: Rng + ?Sized>(
        &self,
        now: i64,
        ttl_secs: i64,
        rng: &mut R,
    ) -> Result<TokenRecord, BrokerError> {
        let record = TokenRecord {
            token: generate_token(rng),
            expires: now + ttl_secs,
            generated: now,
        };
        self.save(&record)?;
        info!(expires = record.expires, "Issued new admin access token");
        Ok(record)
    }
}
