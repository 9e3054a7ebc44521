//! ワーカー操作API
//!
//! `/api/v1/services/:service_id/workers` 配下。起動・停止はワーカーマネージャー、
//! 退避はゲートウェイへ中継する。

use super::error::ApiError;
use super::services::lookup;
use crate::probe::{ProbeOutcome, ACTION_TIMEOUT, SPAWN_TIMEOUT, STATUS_PROBE_TIMEOUT};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use labdash_common::protocol::{WorkerAction, WorkerActionResponse, WorkerListResponse};
use labdash_common::types::WorkerManagerReport;
use std::time::Duration;
use tracing::info;

const MANAGER_UNREACHABLE: &str = "Worker manager not reachable";
const MANAGER_NOT_RESPONDING: &str = "Worker manager not responding";
const GATEWAY_UNREACHABLE: &str = "Gateway not reachable";

/// GET /api/v1/services/:service_id/workers
pub async fn list_workers(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<WorkerListResponse>, ApiError> {
    let service = lookup(&state, &service_id)?;
    let outcome = state
        .probe
        .get(&service.worker_status_url(), STATUS_PROBE_TIMEOUT)
        .await;

    let report = match outcome {
        ProbeOutcome::Success { body, .. } => body
            .map(|body| WorkerManagerReport::from_body(&body))
            .unwrap_or_default(),
        ProbeOutcome::ConnectionRefused => {
            return Err(ApiError::Unavailable(MANAGER_UNREACHABLE.to_string()))
        }
        _ => return Err(ApiError::Unavailable(MANAGER_NOT_RESPONDING.to_string())),
    };

    Ok(Json(WorkerListResponse {
        workers: report.runtime_statuses(&service.workers),
    }))
}

/// POST /api/v1/services/:service_id/workers/:alias/spawn
pub async fn spawn_worker(
    State(state): State<AppState>,
    Path((service_id, alias)): Path<(String, String)>,
) -> Result<Json<WorkerActionResponse>, ApiError> {
    let service = lookup(&state, &service_id)?;
    if !service.has_worker(&alias) {
        return Err(ApiError::WorkerNotFound(alias));
    }

    let url = service.spawn_url(&alias);
    run_action(&state, &url, SPAWN_TIMEOUT, alias, WorkerAction::Spawn).await
}

/// POST /api/v1/services/:service_id/workers/:alias/stop
pub async fn stop_worker(
    State(state): State<AppState>,
    Path((service_id, alias)): Path<(String, String)>,
) -> Result<Json<WorkerActionResponse>, ApiError> {
    let service = lookup(&state, &service_id)?;
    let url = service.stop_url(&alias);
    run_action(&state, &url, ACTION_TIMEOUT, alias, WorkerAction::Stop).await
}

/// POST /api/v1/services/:service_id/workers/:alias/evict
pub async fn evict_worker(
    State(state): State<AppState>,
    Path((service_id, alias)): Path<(String, String)>,
) -> Result<Json<WorkerActionResponse>, ApiError> {
    let service = lookup(&state, &service_id)?;
    let url = service.evict_url(&alias);
    run_action(&state, &url, ACTION_TIMEOUT, alias, WorkerAction::Evict).await
}

async fn run_action(
    state: &AppState,
    url: &str,
    timeout: Duration,
    alias: String,
    action: WorkerAction,
) -> Result<Json<WorkerActionResponse>, ApiError> {
    let outcome = state.probe.post(url, timeout).await;
    // 応答ボディを返すのは起動のみ
    let keep_data = action == WorkerAction::Spawn;

    let response = match outcome {
        ProbeOutcome::Success { body, .. } => {
            info!(worker_alias = %alias, action = action.as_str(), "Worker action succeeded");
            WorkerActionResponse {
                success: true,
                message: format!("Worker '{}' {} successfully", alias, action.past_tense()),
                worker_alias: alias,
                action,
                data: body.filter(|_| keep_data),
            }
        }
        ProbeOutcome::HttpStatus { status, body, .. } => WorkerActionResponse {
            success: false,
            message: format!("Failed to {} worker: HTTP {}", action.as_str(), status),
            worker_alias: alias,
            action,
            data: body.filter(|_| keep_data),
        },
        ProbeOutcome::Timeout => {
            return Err(ApiError::Timeout(format!(
                "Worker {} timeout",
                action.as_str()
            )))
        }
        ProbeOutcome::ConnectionRefused | ProbeOutcome::Transport(_) => {
            let detail = match action {
                WorkerAction::Evict => GATEWAY_UNREACHABLE,
                WorkerAction::Spawn | WorkerAction::Stop => MANAGER_UNREACHABLE,
            };
            return Err(ApiError::Unavailable(detail.to_string()));
        }
    };

    Ok(Json(response))
}
