//! Integration Test: ワーカー操作API

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::dashboard::spawn_dashboard;
use crate::support::upstream::{closed_port, dashboard_yaml, service_yaml, worker_manager};

#[tokio::test]
async fn list_workers_merges_declared_and_active() {
    let manager = worker_manager(json!({
        "workers": {"qwen": {"port": 8101, "uptime_seconds": 30, "idle_seconds": 2}}
    }))
    .await;
    let yaml = dashboard_yaml(
        &[service_yaml("llm", closed_port(), manager.address().port())],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let body: Value = reqwest::get(dashboard.url("/api/v1/services/llm/workers"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let workers = body["workers"].as_array().unwrap();
    assert_eq!(workers.len(), 2);
    assert_eq!(workers[0]["alias"], "qwen");
    assert_eq!(workers[0]["status"], "running");
    assert_eq!(workers[0]["uptime_seconds"], 30.0);
    assert_eq!(workers[1]["status"], "stopped");
    assert!(workers[1].get("port").is_none());

    dashboard.stop().await;
}

#[tokio::test]
async fn list_workers_tolerates_odd_entries_in_manager_body() {
    let manager = worker_manager(json!({
        "workers": {"llama": {"port": 8102}, "adhoc": "starting"},
        "memory": "n/a"
    }))
    .await;
    let yaml = dashboard_yaml(
        &[service_yaml("llm", closed_port(), manager.address().port())],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let response = reqwest::get(dashboard.url("/api/v1/services/llm/workers"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["workers"][0]["status"], "stopped");
    assert_eq!(body["workers"][1]["status"], "running");
    assert_eq!(body["workers"][1]["port"], 8102);

    dashboard.stop().await;
}

#[tokio::test]
async fn list_workers_unreachable_manager_is_503() {
    let yaml = dashboard_yaml(&[service_yaml("llm", closed_port(), closed_port())], 5);
    let dashboard = spawn_dashboard(&yaml).await;

    let response = reqwest::get(dashboard.url("/api/v1/services/llm/workers"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Worker manager not reachable");

    dashboard.stop().await;
}

#[tokio::test]
async fn spawn_forwards_to_worker_manager() {
    let manager = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/spawn/qwen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"port": 8101})))
        .expect(1)
        .mount(&manager)
        .await;
    let yaml = dashboard_yaml(
        &[service_yaml("llm", closed_port(), manager.address().port())],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let body: Value = Client::new()
        .post(dashboard.url("/api/v1/services/llm/workers/qwen/spawn"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["action"], "spawn");
    assert_eq!(body["worker_alias"], "qwen");
    assert_eq!(body["message"], "Worker 'qwen' spawned successfully");
    assert_eq!(body["data"]["port"], 8101);

    dashboard.stop().await;
}

#[tokio::test]
async fn spawn_rejects_undeclared_alias() {
    let manager = MockServer::start().await;
    let yaml = dashboard_yaml(
        &[service_yaml("llm", closed_port(), manager.address().port())],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let response = Client::new()
        .post(dashboard.url("/api/v1/services/llm/workers/ghost/spawn"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Worker not found: ghost");
    assert!(manager.received_requests().await.unwrap().is_empty());

    dashboard.stop().await;
}

#[tokio::test]
async fn stop_reports_upstream_failure() {
    let manager = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stop/qwen"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&manager)
        .await;
    let yaml = dashboard_yaml(
        &[service_yaml("llm", closed_port(), manager.address().port())],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let response = Client::new()
        .post(dashboard.url("/api/v1/services/llm/workers/qwen/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to stop worker: HTTP 500");
    assert!(body.get("data").is_none());

    dashboard.stop().await;
}

#[tokio::test]
async fn evict_goes_through_gateway_template() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/system/evict/llama"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"evicted": true})))
        .expect(1)
        .mount(&gateway)
        .await;
    let yaml = dashboard_yaml(
        &[service_yaml("llm", gateway.address().port(), closed_port())],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let body: Value = Client::new()
        .post(dashboard.url("/api/v1/services/llm/workers/llama/evict"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Worker 'llama' evicted successfully");
    assert!(body.get("data").is_none());

    dashboard.stop().await;
}

#[tokio::test]
async fn evict_unreachable_gateway_is_503() {
    let yaml = dashboard_yaml(&[service_yaml("llm", closed_port(), closed_port())], 5);
    let dashboard = spawn_dashboard(&yaml).await;

    let response = Client::new()
        .post(dashboard.url("/api/v1/services/llm/workers/qwen/evict"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Gateway not reachable");

    dashboard.stop().await;
}
