/// API request handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::app::AppContext;
use crate::core::{window_start, DashboardContext, SampleRow};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(msg: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<T>>)>;

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_minutes")]
    minutes: i64,
}

fn default_minutes() -> i64 {
    60
}

#[derive(Serialize)]
pub struct LayoutSummary {
    rows: usize,
    widgets: usize,
}

// ============================================================================
// Dashboard Handlers
// ============================================================================

pub async fn get_dashboard(State(ctx): State<Arc<AppContext>>) -> Json<ApiResponse<DashboardContext>> {
    Json(ApiResponse::ok(ctx.render().await))
}

pub async fn get_history(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<SampleRow>> {
    let since = window_start(query.minutes).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "minutes must be positive and within range, got {}",
                query.minutes
            ))),
        )
    })?;
    let store_ctx = ctx.clone();

    // File reads stay off the async workers
    let rows = tokio::task::spawn_blocking(move || store_ctx.history_since(since))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        })?
        .map_err(|e| {
            tracing::error!("failed to read history: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        })?;

    Ok(Json(ApiResponse::ok(rows)))
}

pub async fn reload_layout(State(ctx): State<Arc<AppContext>>) -> ApiResult<LayoutSummary> {
    let reloaded = tokio::task::spawn_blocking(move || ctx.reload_layout())
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        })?;

    match reloaded {
        Ok(layout) => {
            tracing::info!(rows = layout.rows().len(), "layout reloaded");
            Ok(Json(ApiResponse::ok(LayoutSummary {
                rows: layout.rows().len(),
                widgets: layout.widget_count(),
            })))
        }
        Err(e) => {
            tracing::warn!("layout reload rejected, keeping current layout: {}", e);
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::error(e.to_string())),
            ))
        }
    }
}

// ============================================================================
// Monitoring Handlers
// ============================================================================

pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::ok("healthy".to_string()))
}
