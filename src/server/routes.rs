/// API routes definition

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::static_files;
use super::websocket;
use crate::app::AppContext;

pub fn create_router(ctx: Arc<AppContext>, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/history", get(handlers::get_history))
        .route("/api/layout/reload", post(handlers::reload_layout))
        .route("/api/health", get(handlers::health_check))
        .route("/ws/dashboard", get(websocket::ws_dashboard_handler));

    let mut app = Router::new()
        .merge(api_routes)
        // Embedded page and assets; must be last to act as catch-all
        .fallback(static_files::static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    if enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_context;
    use crate::core::{HistoryStore, SampleRow, SampleSink};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn call(router: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_dashboard_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(test_context(dir.path(), "[row0]\na=links\nb=links\nc=links\n", false));

        let (status, json) = call(create_router(ctx, false), "GET", "/api/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let widgets = json["data"]["rows"][0]["widgets"].as_array().unwrap();
        let sizes: Vec<_> = widgets.iter().map(|w| w["size"].as_u64().unwrap()).collect();
        assert_eq!(sizes, vec![4, 4, 4]);
        assert_eq!(json["data"]["host"], "box");
        assert!(json["data"].get("music").is_none());
    }

    #[tokio::test]
    async fn test_history_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(test_context(dir.path(), "[row0]\na=links\n", true));

        let store = HistoryStore::open(dir.path().join("history.jsonl")).unwrap();
        store
            .append(&SampleRow {
                timestamp: Utc::now(),
                load_1: 0.5,
                load_5: 0.4,
                load_15: 0.3,
                mem_free: 1,
                mem_cache: None,
                mem_active: 2,
                mem_total: None,
                mem_buffers: None,
                mem_swap_cached: None,
            })
            .unwrap();

        let (status, json) = call(create_router(ctx.clone(), false), "GET", "/api/history?minutes=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["load_1"], 0.5);

        let (status, _) = call(create_router(ctx.clone(), false), "GET", "/api/history?minutes=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_window_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(test_context(dir.path(), "[row0]\na=links\n", true));

        let uri = format!("/api/history?minutes={}", i64::MAX);
        let (status, json) = call(create_router(ctx.clone(), false), "GET", &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        // far back but still representable
        let (status, _) = call(create_router(ctx, false), "GET", "/api/history?minutes=100000000000").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_websocket_pushes_render_context() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(test_context(dir.path(), "[row0]\na=links\nb=links\n", false));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, create_router(ctx, false)).await });

        let text = tokio::task::spawn_blocking(move || {
            let (mut socket, _) = tungstenite::connect(format!("ws://{}/ws/dashboard", addr)).unwrap();
            let message = socket.read().unwrap();
            message.to_text().unwrap().to_string()
        })
        .await
        .unwrap();

        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["host"], "box");
        assert_eq!(json["rows"][0]["widgets"][1]["size"], 6);
    }

    #[tokio::test]
    async fn test_reload_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(test_context(dir.path(), "[row0]\na=links\n", false));

        std::fs::write(dir.path().join("layout.cfg"), "[a]\nx=links\n[b]\ny=links\n").unwrap();
        let (status, json) = call(create_router(ctx.clone(), false), "POST", "/api/layout/reload").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["rows"], 2);

        std::fs::write(dir.path().join("layout.cfg"), "").unwrap();
        let (status, json) = call(create_router(ctx.clone(), false), "POST", "/api/layout/reload").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
        assert_eq!(ctx.layout().rows().len(), 2);
    }

    #[tokio::test]
    async fn test_health_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(test_context(dir.path(), "[row0]\na=links\n", false));

        let (status, json) = call(create_router(ctx.clone(), false), "GET", "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], "healthy");

        let response = create_router(ctx, false)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/html"));

        // the page follows the server push rather than its own timer
        let page = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(page.to_vec()).unwrap();
        assert!(page.contains("/ws/dashboard"));
        assert!(!page.contains("setInterval"));
    }
}
