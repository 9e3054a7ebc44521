//! Integration Test: システム情報API

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::dashboard::spawn_dashboard;
use crate::support::upstream::{
    closed_port, dashboard_yaml, gateway, service_yaml, worker_manager,
};

#[tokio::test]
async fn overview_deduplicates_shared_worker_managers() {
    let healthy = gateway(200).await;
    let shared_manager = worker_manager(json!({
        "workers": {"qwen": {"port": 8101}, "flux": {"port": 8201}},
        "memory": {"total_gb": 64.0, "available_gb": 20.0, "used_gb": 44.0, "used_percent": 68.75}
    }))
    .await;
    let manager_port = shared_manager.address().port();

    let yaml = dashboard_yaml(
        &[
            service_yaml("llm", healthy.address().port(), manager_port),
            service_yaml("image", closed_port(), manager_port),
        ],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let body: Value = reqwest::get(dashboard.url("/api/v1/system/overview"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["services_count"], 2);
    assert_eq!(body["healthy_services"], 1);
    assert_eq!(body["unhealthy_services"], 1);
    assert_eq!(body["total_workers"], 4);
    assert_eq!(body["running_workers"], 2);

    let managers = body["worker_managers"].as_array().unwrap();
    assert_eq!(managers.len(), 1);
    assert_eq!(managers[0]["service_id"], "llm");
    assert_eq!(managers[0]["reachable"], true);
    assert_eq!(managers[0]["memory"]["used_percent"], 68.75);

    dashboard.stop().await;
}

#[tokio::test]
async fn overview_reports_unreachable_manager() {
    let yaml = dashboard_yaml(&[service_yaml("llm", closed_port(), closed_port())], 5);
    let dashboard = spawn_dashboard(&yaml).await;

    let body: Value = reqwest::get(dashboard.url("/api/v1/system/overview"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let manager = &body["worker_managers"][0];
    assert_eq!(manager["reachable"], false);
    assert_eq!(manager["workers_count"], 0);
    assert_eq!(manager["error"], "connection refused");
    assert_eq!(body["running_workers"], 0);

    dashboard.stop().await;
}

#[tokio::test]
async fn memory_lists_only_reporting_managers() {
    let reporting = worker_manager(json!({
        "workers": {},
        "memory": {"total_gb": 32.0, "gpu": "m2-ultra"}
    }))
    .await;
    let silent = worker_manager(json!({"workers": {}})).await;

    let yaml = dashboard_yaml(
        &[
            service_yaml("llm", closed_port(), reporting.address().port()),
            service_yaml("audio", closed_port(), silent.address().port()),
        ],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let body: Value = reqwest::get(dashboard.url("/api/v1/system/memory"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let sources = body["memory_sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["service_id"], "llm");
    assert_eq!(sources[0]["total_gb"], 32.0);
    assert_eq!(sources[0]["gpu"], "m2-ultra");
    assert_eq!(
        sources[0]["source"],
        format!("http://127.0.0.1:{}", reporting.address().port())
    );

    dashboard.stop().await;
}

#[tokio::test]
async fn stop_all_forwards_to_worker_manager() {
    let manager = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stop-all"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&manager)
        .await;
    let yaml = dashboard_yaml(
        &[service_yaml("llm", closed_port(), manager.address().port())],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;
    let client = Client::new();

    let body: Value = client
        .post(dashboard.url("/api/v1/system/worker-manager/llm/stop-all"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "All workers stopped");

    let response = client
        .post(dashboard.url("/api/v1/system/worker-manager/gpu/stop-all"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    dashboard.stop().await;
}
