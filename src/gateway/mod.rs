//! HTTP 网关
//!
//! 演示宿主集成：每个请求根据 Host 头跑一遍引导流程，
//! 后台与登录页在租户请求上执行管理员令牌握手。

mod handlers;
mod trace;

use anyhow::Result;
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

use tenancy_broker::{
    AdminHandshake, AdminTokenBroker, MemorySessionIssuer, NoticeStore, SqliteAdminDirectory,
};
use tenancy_common::storage::{FileMappingStore, MappingStore, PathResolver, SiteDatabase};
use tenancy_common::TenancyConfig;

pub use handlers::ResolvedRequest;
pub use trace::http_trace_layer;

/// 网关共享状态
#[derive(Clone)]
pub struct GatewayState {
    config: Arc<TenancyConfig>,
    store: Arc<dyn MappingStore>,
    db: SiteDatabase,
    handshake: Arc<AdminHandshake>,
}

impl GatewayState {
    pub fn new(config: TenancyConfig, db: SiteDatabase) -> Self {
        let resolver = PathResolver::new(config.host.clone());
        let store: Arc<dyn MappingStore> =
            Arc::new(FileMappingStore::new(resolver.mappings_file_path()));
        let handshake = AdminHandshake::new(
            AdminTokenBroker::from_config(&config, &resolver),
            Arc::new(SqliteAdminDirectory::new(db.get_pool().clone())),
            Arc::new(MemorySessionIssuer::new(config.gateway.session_ttl_secs)),
            Arc::new(NoticeStore::new()),
            &config.host,
        );

        Self {
            config: Arc::new(config),
            store,
            db,
            handshake: Arc::new(handshake),
        }
    }

    /// 按配置连接站点数据库
    pub async fn connect(config: TenancyConfig) -> Result<Self> {
        let db =
            SiteDatabase::connect(&config.gateway.database_url, &config.host.default_table_prefix)
                .await?;
        info!(database_url = %config.gateway.database_url, "Site database connected");
        Ok(Self::new(config, db))
    }

    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    pub fn handshake(&self) -> &AdminHandshake {
        &self.handshake
    }
}

/// 创建网关路由
pub fn create_router(state: GatewayState) -> Router {
    let admin_path = state.config.host.admin_path.clone();
    let admin_root = admin_path.trim_end_matches('/').to_string();
    let login_path = state.config.host.login_path.clone();

    let mut router = Router::new()
        .route(&admin_path, get(handlers::admin_handler))
        .route(&login_path, get(handlers::login_handler))
        .route("/_tenancy/info", get(handlers::info_handler))
        .route("/_tenancy/health", get(handlers::health_handler));
    if !admin_root.is_empty() && admin_root != admin_path {
        router = router.route(&admin_root, get(handlers::admin_handler));
    }

    router.layer(http_trace_layer()).with_state(state)
}

/// 启动网关并阻塞到收到关闭信号
pub async fn serve(state: GatewayState, shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    let addr: SocketAddr = state.config.gateway.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to address '{addr}': {e}"))?;
    info!("Gateway listening on {}", listener.local_addr()?);

    let mut shutdown_rx = shutdown_tx.subscribe();
    let server = axum::serve(listener, create_router(state)).with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
        info!("Gateway received shutdown signal");
    });

    if let Err(e) = server.await {
        error!("Gateway server error: {}", e);
        return Err(e.into());
    }
    info!("Gateway stopped");
    Ok(())
}
