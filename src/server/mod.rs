/// HTTP server for the dashboard page and its JSON API

#[cfg(feature = "server")]
pub mod routes;

#[cfg(feature = "server")]
pub mod handlers;

#[cfg(feature = "server")]
pub mod websocket;

#[cfg(feature = "server")]
pub mod static_files;

#[cfg(feature = "server")]
pub use routes::create_router;

#[cfg(feature = "server")]
pub async fn run(ctx: std::sync::Arc<crate::app::AppContext>, enable_cors: bool) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::net::SocketAddr;

    let config = ctx.config();
    let addr: SocketAddr = format!("{}:{}", config.bind_host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_host, config.port))?;

    let mut sampler = ctx.build_sampler()?;
    let app = create_router(ctx.clone(), enable_cors);

    println!("📊 newtab-server");
    println!("   📍 Dashboard: http://{}", addr);
    println!("   🔌 API:       http://{}/api", addr);
    println!();
    println!("📚 API Endpoints:");
    println!("   GET  /api/dashboard          - Render context for the page");
    println!("   GET  /api/history?minutes=N  - Recorded samples");
    println!("   POST /api/layout/reload      - Re-read the layout file");
    println!("   GET  /api/health             - Health check");
    println!("   GET  /ws/dashboard           - WebSocket render stream");
    println!();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "listening");

    // Only sample once the server is certain to come up
    if let Some(sampler) = sampler.as_mut() {
        sampler.start();
    }

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop sampling before reporting how serving ended
    if let Some(sampler) = sampler.as_mut() {
        sampler.stop().await;
    }

    served.context("Server error")?;
    Ok(())
}

#[cfg(feature = "server")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;
    use crate::app::test_context_with;
    use crate::utils::AppConfig;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bind_failure_never_starts_sampler() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

        let mut config = AppConfig::default();
        config.bind_host = "127.0.0.1".to_string();
        config.port = occupied.local_addr().unwrap().port();
        config.sampler.interval = Duration::from_millis(5);

        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(test_context_with(dir.path(), "[row0]\na=links\n", true, config));

        assert!(run(ctx.clone(), false).await.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let since = chrono::Utc::now() - chrono::Duration::days(1);
        assert!(ctx.history_since(since).unwrap().is_empty());
    }
}
