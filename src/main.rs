//! Honeypot HTTP 服务
//!
//! 入口：加载配置、初始化日志、构建共享组件，启动后台清扫与 HTTP 服务；
//! 收到 Ctrl+C / SIGTERM 后停止接收请求，清空会话缓存并等待驱逐清理完成。
//!
//! 启动: cargo run --bin honeypot [-- <config.toml>]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use honeypot::api::{router, ApiState};
use honeypot::core::{
    spawn_sweeper, CacheShutdown, CleanupQueueDrain, ShutdownCoordinator, ShutdownManager,
};
use honeypot::{build_components, load_config, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init()?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("Invalid server address")?;

    let components = Arc::new(build_components(cfg).context("Failed to build components")?);

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let sweeper = spawn_sweeper(
        components.maintained_caches(),
        components.config.cache.sweep_interval(),
        shutdown.token(),
    );

    let mut coordinator = ShutdownCoordinator::new().with_timeout(10);
    for cache in components.maintained_caches() {
        coordinator.register(CacheShutdown::new(cache));
    }
    coordinator.register(CleanupQueueDrain::new(components.cleanup.clone()));

    let app = router(ApiState::new(Arc::clone(&components)));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(
        "Honeypot server listening on http://{} (api prefix {})",
        addr,
        components.config.server.api_prefix
    );

    let token = shutdown.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("Server error")?;

    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Sweeper task ended abnormally");
    }
    coordinator.run_cleanup().await;
    tracing::info!("Honeypot server stopped");
    Ok(())
}
