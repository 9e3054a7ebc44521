//! Integration Test: サービスステータスAPI

use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::dashboard::spawn_dashboard;
use crate::support::upstream::{
    closed_port, dashboard_yaml, gateway, service_yaml, worker_manager,
};

#[tokio::test]
async fn list_services_reports_each_service_in_config_order() {
    let llm_gateway = gateway(200).await;
    let llm_manager = worker_manager(json!({"workers": {"llama": {"port": 8102}}})).await;

    let yaml = dashboard_yaml(
        &[
            service_yaml(
                "llm",
                llm_gateway.address().port(),
                llm_manager.address().port(),
            ),
            service_yaml("audio", closed_port(), closed_port()),
        ],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let response = reqwest::get(dashboard.url("/api/v1/services")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    let services = body["services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["service_id"], "llm");
    assert_eq!(services[0]["status"], "healthy");
    assert_eq!(services[0]["description"], "llm backend");
    assert_eq!(services[0]["icon"], "cpu");
    assert_eq!(services[0]["workers"][0]["status"], "stopped");
    assert_eq!(services[0]["workers"][1]["status"], "running");
    assert_eq!(services[1]["service_id"], "audio");
    assert_eq!(services[1]["status"], "unhealthy");
    assert_eq!(services[1]["gateway"]["error"], "connection refused");
    assert!(body["timestamp"].is_number());

    dashboard.stop().await;
}

#[tokio::test]
async fn get_service_returns_404_for_unknown_id() {
    let yaml = dashboard_yaml(&[service_yaml("llm", closed_port(), closed_port())], 5);
    let dashboard = spawn_dashboard(&yaml).await;

    let response = reqwest::get(dashboard.url("/api/v1/services/gpu")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Service not found: gpu");

    let response = reqwest::get(dashboard.url("/api/v1/services/llm")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    dashboard.stop().await;
}

#[tokio::test]
async fn system_status_is_proxied_from_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/system/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"loaded_models": ["qwen"]})),
        )
        .mount(&upstream)
        .await;

    let yaml = dashboard_yaml(
        &[service_yaml("llm", upstream.address().port(), closed_port())],
        5,
    );
    let dashboard = spawn_dashboard(&yaml).await;

    let body: Value = reqwest::get(dashboard.url("/api/v1/services/llm/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["loaded_models"][0], "qwen");

    dashboard.stop().await;
}

#[tokio::test]
async fn system_status_unreachable_gateway_is_503() {
    let yaml = dashboard_yaml(&[service_yaml("llm", closed_port(), closed_port())], 5);
    let dashboard = spawn_dashboard(&yaml).await;

    let response = reqwest::get(dashboard.url("/api/v1/services/llm/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Service unavailable"));

    dashboard.stop().await;
}
