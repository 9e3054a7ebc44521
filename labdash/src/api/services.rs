//! サービスステータスAPI
//!
//! `/api/v1/services` 配下。呼び出しのたびに上流を確認する（ポーリング結果は使わない）。

use super::error::ApiError;
use crate::probe::{ProbeOutcome, GATEWAY_STATUS_TIMEOUT};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use labdash_common::config::ServiceDescriptor;
use labdash_common::protocol::{ServiceListResponse, ServiceStatus};
use labdash_common::unix_timestamp;
use serde_json::Value;

/// 設定済みサービスを取得（無ければ404）
pub(crate) fn lookup<'a>(
    state: &'a AppState,
    service_id: &str,
) -> Result<&'a ServiceDescriptor, ApiError> {
    state
        .directory
        .get(service_id)
        .ok_or_else(|| ApiError::ServiceNotFound(service_id.to_string()))
}

async fn service_status(state: &AppState, service: &ServiceDescriptor) -> ServiceStatus {
    ServiceStatus {
        snapshot: state.checker.check_service(service).await,
        description: service.description.clone(),
        icon: service.icon.clone(),
    }
}

/// GET /api/v1/services
pub async fn list_services(State(state): State<AppState>) -> Json<ServiceListResponse> {
    let mut services = Vec::with_capacity(state.directory.len());
    for service in state.directory.list() {
        services.push(service_status(&state, service).await);
    }

    Json(ServiceListResponse {
        services,
        timestamp: unix_timestamp(),
    })
}

/// GET /api/v1/services/:service_id
pub async fn get_service(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<ServiceStatus>, ApiError> {
    let service = lookup(&state, &service_id)?;
    Ok(Json(service_status(&state, service).await))
}

/// GET /api/v1/services/:service_id/status
///
/// ゲートウェイのシステムステータスをそのまま返す。
pub async fn get_service_system_status(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let service = lookup(&state, &service_id)?;
    let outcome = state
        .probe
        .get(&service.gateway_status_url(), GATEWAY_STATUS_TIMEOUT)
        .await;

    match outcome {
        ProbeOutcome::Success { body: Some(body), .. }
        | ProbeOutcome::HttpStatus { body: Some(body), .. } => Ok(Json(body)),
        ProbeOutcome::Success { .. } | ProbeOutcome::HttpStatus { .. } => Err(
            ApiError::Unavailable("Service unavailable: invalid status body".to_string()),
        ),
        other => Err(ApiError::Unavailable(format!(
            "Service unavailable: {}",
            other.error().unwrap_or_default()
        ))),
    }
}
