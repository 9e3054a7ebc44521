use std::net::SocketAddr;
use std::time::Duration;

use labdash::AppState;
use labdash_common::config::DashboardConfig;
use tokio::{net::TcpListener, task::JoinHandle};

/// テスト用に起動したダッシュボードサーバー
#[allow(dead_code)]
pub struct TestDashboard {
    pub state: AppState,
    addr: SocketAddr,
    handle: JoinHandle<std::io::Result<()>>,
}

#[allow(dead_code)]
impl TestDashboard {
    /// サーバーがバインドしているアドレス
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// REST APIのURL
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// WebSocketのURL
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// ポーリングとサーバーを停止し、終了を待つ
    pub async fn stop(self) {
        self.state.checker.stop().await;
        self.state.shutdown.request_shutdown();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// YAML設定からダッシュボードを起動する（ポーリングは開始しない）
#[allow(dead_code)]
pub async fn spawn_dashboard(yaml: &str) -> TestDashboard {
    let config = DashboardConfig::from_yaml_str(yaml).expect("invalid test config");
    let state = AppState::new(&config);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    let handle = tokio::spawn(labdash::server::serve(listener, state.clone()));

    TestDashboard {
        state,
        addr,
        handle,
    }
}

/// 条件が満たされるまで待つ
#[allow(dead_code)]
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
