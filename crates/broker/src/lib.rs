//! 管理员令牌代理
//!
//! - 令牌文件与状态机（absent / valid / expired）
//! - 域名哈希
//! - 租户后台登录链接与令牌校验
//! - 登录握手、一次性提示、管理员查找、会话签发

pub mod broker;
pub mod directory;
pub mod error;
pub mod handshake;
pub mod hash;
pub mod notice;
pub mod session;
pub mod store;

pub use broker::{AdminTokenBroker, TokenRejection};
pub use directory::{AdminAccount, AdminDirectory, SqliteAdminDirectory};
pub use error::BrokerError;
pub use handshake::{AdminHandshake, AdminSurface, HandshakeOutcome, HandshakeRequest};
pub use hash::{domain_hash, normalize_domain};
pub use notice::NoticeStore;
pub use session::{MemorySessionIssuer, Session, SessionIssuer};
pub use store::{TokenRecord, TokenState, TokenStore};
