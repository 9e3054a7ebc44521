//! システム情報API
//!
//! 複数サービスが同じワーカーマネージャーを共有できるため、
//! ワーカーマネージャー単位の集計はURLで重複排除する（最初に現れたサービスIDで報告）。

use super::error::ApiError;
use super::services::lookup;
use crate::probe::{ProbeOutcome, ACTION_TIMEOUT, STATUS_PROBE_TIMEOUT};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use labdash_common::config::ServiceDescriptor;
use labdash_common::protocol::{
    ActionResult, MemoryReport, MemorySource, SystemOverview, WorkerManagerStatus,
};
use labdash_common::types::WorkerManagerReport;
use labdash_common::unix_timestamp;
use std::collections::HashSet;

/// 共有ワーカーマネージャーを1回ずつ列挙する
fn distinct_worker_managers(services: &[ServiceDescriptor]) -> Vec<&ServiceDescriptor> {
    let mut seen = HashSet::new();
    services
        .iter()
        .filter(|service| seen.insert(service.worker_manager.url()))
        .collect()
}

async fn fetch_report(
    state: &AppState,
    service: &ServiceDescriptor,
) -> Result<WorkerManagerReport, String> {
    let outcome = state
        .probe
        .get(&service.worker_status_url(), STATUS_PROBE_TIMEOUT)
        .await;
    if !outcome.is_success() {
        return Err(outcome.error().unwrap_or_default());
    }
    Ok(outcome
        .into_body()
        .map(|body| WorkerManagerReport::from_body(&body))
        .unwrap_or_default())
}

/// GET /api/v1/system/overview
pub async fn get_system_overview(State(state): State<AppState>) -> Json<SystemOverview> {
    let services = state.directory.list();

    let mut healthy_services = 0;
    let mut total_workers = 0;
    for service in services {
        let outcome = state
            .probe
            .get(&service.health_url(), STATUS_PROBE_TIMEOUT)
            .await;
        if outcome.is_success() {
            healthy_services += 1;
        }
        total_workers += service.workers.len();
    }

    let mut running_workers = 0;
    let mut worker_managers = Vec::new();
    for service in distinct_worker_managers(services) {
        let status = match fetch_report(&state, service).await {
            Ok(report) => WorkerManagerStatus {
                service_id: service.id.clone(),
                reachable: true,
                workers_count: report.workers.len(),
                memory: report.memory_status(),
                error: None,
            },
            Err(error) => WorkerManagerStatus {
                service_id: service.id.clone(),
                reachable: false,
                workers_count: 0,
                memory: None,
                error: Some(error),
            },
        };
        running_workers += status.workers_count;
        worker_managers.push(status);
    }

    Json(SystemOverview {
        timestamp: unix_timestamp(),
        services_count: services.len(),
        healthy_services,
        unhealthy_services: services.len() - healthy_services,
        total_workers,
        running_workers,
        worker_managers,
    })
}

/// GET /api/v1/system/memory
pub async fn get_system_memory(State(state): State<AppState>) -> Json<MemoryReport> {
    let mut memory_sources = Vec::new();
    for service in distinct_worker_managers(state.directory.list()) {
        if let Ok(WorkerManagerReport {
            memory: Some(memory),
            ..
        }) = fetch_report(&state, service).await
        {
            memory_sources.push(MemorySource {
                source: service.worker_manager.url(),
                service_id: service.id.clone(),
                memory,
            });
        }
    }

    Json(MemoryReport {
        timestamp: unix_timestamp(),
        memory_sources,
    })
}

/// POST /api/v1/system/worker-manager/:service_id/stop-all
pub async fn stop_all_workers(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<ActionResult>, ApiError> {
    let service = lookup(&state, &service_id)?;
    let outcome = state
        .probe
        .post(&service.stop_all_url(), ACTION_TIMEOUT)
        .await;

    match outcome {
        ProbeOutcome::Success { .. } => Ok(Json(ActionResult {
            success: true,
            message: "All workers stopped".to_string(),
        })),
        ProbeOutcome::HttpStatus { status, .. } => Ok(Json(ActionResult {
            success: false,
            message: format!("Failed: HTTP {}", status),
        })),
        ProbeOutcome::Timeout => Err(ApiError::Timeout("Worker manager timeout".to_string())),
        ProbeOutcome::ConnectionRefused | ProbeOutcome::Transport(_) => Err(
            ApiError::Unavailable("Worker manager not reachable".to_string()),
        ),
    }
}
