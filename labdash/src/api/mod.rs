//! HTTP / WebSocket API
//!
//! ルーティングの組み立て。ハンドラーは機能ごとのサブモジュールに置く。

pub mod dashboard_ws;
pub mod error;
pub mod services;
pub mod system;
pub mod workers;

use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use labdash_common::unix_timestamp;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// アプリケーションのルーターを作成
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/ws", get(dashboard_ws::dashboard_ws_handler))
        .route("/api/v1/services", get(services::list_services))
        .route("/api/v1/services/:service_id", get(services::get_service))
        .route(
            "/api/v1/services/:service_id/status",
            get(services::get_service_system_status),
        )
        .route(
            "/api/v1/services/:service_id/workers",
            get(workers::list_workers),
        )
        .route(
            "/api/v1/services/:service_id/workers/:alias/spawn",
            post(workers::spawn_worker),
        )
        .route(
            "/api/v1/services/:service_id/workers/:alias/stop",
            post(workers::stop_worker),
        )
        .route(
            "/api/v1/services/:service_id/workers/:alias/evict",
            post(workers::evict_worker),
        )
        .route("/api/v1/system/overview", get(system::get_system_overview))
        .route("/api/v1/system/memory", get(system::get_system_memory))
        .route(
            "/api/v1/system/worker-manager/:service_id/stop-all",
            post(system::stop_all_workers),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /healthz
async fn healthz() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": unix_timestamp(),
    }))
}

/// GET /
async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "Homelab Dashboard API",
        "version": env!("CARGO_PKG_VERSION"),
        "services_count": state.directory.len(),
        "endpoints": {
            "health": "/healthz",
            "services": "/api/v1/services",
            "system": "/api/v1/system/overview",
            "websocket": "/ws",
        },
    }))
}
