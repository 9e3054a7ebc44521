use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 何も待ち受けていないポート
#[allow(dead_code)]
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// `/healthz` に固定ステータスを返すゲートウェイ
#[allow(dead_code)]
pub async fn gateway(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

/// `/status` にJSONを返すワーカーマネージャー
#[allow(dead_code)]
pub async fn worker_manager(status: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status))
        .mount(&server)
        .await;
    server
}

/// サービス1件分の設定YAML（qwen / llama の2ワーカー）
#[allow(dead_code)]
pub fn service_yaml(id: &str, gateway_port: u16, manager_port: u16) -> String {
    format!(
        r#"
  {id}:
    name: {id} service
    description: {id} backend
    icon: cpu
    gateway: {{ host: 127.0.0.1, port: {gateway_port} }}
    worker_manager: {{ host: 127.0.0.1, port: {manager_port} }}
    workers:
      - {{ alias: qwen, name: Qwen, type: llm }}
      - {{ alias: llama, name: Llama, type: llm }}
"#
    )
}

/// サービス設定を並べたダッシュボード設定YAML
#[allow(dead_code)]
pub fn dashboard_yaml(services: &[String], status_interval_secs: u64) -> String {
    format!(
        "polling:\n  status_interval_seconds: {status_interval_secs}\nservices:{}",
        services.concat()
    )
}
