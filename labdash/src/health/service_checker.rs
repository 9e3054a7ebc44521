//! サービスヘルスチェッカー
//!
//! 1ティックで全サービスを設定順に確認する。ティック同士は重ならない。
//!
//! - ゲートウェイ: `GET {gateway}{endpoints.health}`、200なら到達可能
//! - ワーカー: `GET {worker_manager}{status_path}` の `workers` を宣言済みワーカーと照合
//!   - 応答に含まれる → running、含まれない → stopped
//!   - ワーカーマネージャーに届かない・200以外 → 全ワーカー unknown
//!   - 200なら応答の形式が崩れていても unknown にはしない

use super::HealthError;
use crate::events::{BroadcastHub, Channel};
use crate::probe::{ProbeClient, STATUS_PROBE_TIMEOUT};
use crate::registry::ServiceDirectory;
use futures::FutureExt;
use labdash_common::config::ServiceDescriptor;
use labdash_common::types::{
    unknown_workers, ServiceStatusSnapshot, WorkerManagerReport, WorkerRuntimeStatus,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// デフォルトのチェック間隔
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// サービスヘルスチェッカー
///
/// クローンは同じ監視タスクを共有する。`start` / `stop` はどのクローンから呼んでもよい。
#[derive(Debug, Clone)]
pub struct HealthChecker {
    directory: ServiceDirectory,
    probe: ProbeClient,
    hub: BroadcastHub,
    interval: Duration,
    task: Arc<Mutex<Option<MonitorTask>>>,
}

impl HealthChecker {
    /// 新しいヘルスチェッカーを作成
    pub fn new(directory: ServiceDirectory, probe: ProbeClient, hub: BroadcastHub) -> Self {
        Self {
            directory,
            probe,
            hub,
            interval: DEFAULT_CHECK_INTERVAL,
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// チェック間隔を設定
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// チェック間隔
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// バックグラウンドで監視を開始
    ///
    /// 既に動いている場合は何もせず `false` を返す。
    pub async fn start(&self) -> bool {
        let mut slot = self.task.lock().await;
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            debug!("Health checker already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.clone().monitor_loop(cancel.clone()));
        *slot = Some(MonitorTask { cancel, handle });
        true
    }

    /// 監視を停止し、ループの終了を待つ
    ///
    /// 戻った時点以降、次の `start` までティックは走らない。
    pub async fn stop(&self) -> bool {
        let mut slot = self.task.lock().await;
        let Some(task) = slot.take() else {
            return false;
        };

        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            if e.is_panic() {
                error!(error = %e, "Health checker task panicked");
            }
        }
        true
    }

    /// 監視ループが動いているか
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    async fn monitor_loop(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            services = self.directory.len(),
            "Health checker started"
        );

        loop {
            let sweep = AssertUnwindSafe(self.check_all_services()).catch_unwind();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = sweep => {
                    if let Err(panic) = result {
                        error!(panic = %panic_message(panic.as_ref()), "Health check sweep panicked");
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Health checker stopped");
    }

    /// 全サービスを1回ずつチェックして配信
    ///
    /// 配信したスナップショット数を返す。1サービスの失敗は残りのサービスに影響しない。
    pub async fn check_all_services(&self) -> usize {
        let mut published = 0;

        for service in self.directory.list() {
            let result = AssertUnwindSafe(self.check_and_publish(service))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(HealthError::Panicked(panic_message(panic.as_ref())))
                });

            match result {
                Ok(_) => published += 1,
                Err(e) => warn!(service_id = %service.id, error = %e, "Service check failed"),
            }
        }

        debug!(published, "Health check sweep completed");
        published
    }

    /// 全サービスのスナップショットを取得（配信しない）
    pub async fn snapshot_all(&self) -> Vec<ServiceStatusSnapshot> {
        let mut snapshots = Vec::with_capacity(self.directory.len());
        for service in self.directory.list() {
            snapshots.push(self.check_service(service).await);
        }
        snapshots
    }

    async fn check_and_publish(&self, service: &ServiceDescriptor) -> Result<usize, HealthError> {
        let snapshot = self.check_service(service).await;
        let delivered = self.hub.publish(Channel::Services, &snapshot).await?;
        Ok(delivered)
    }

    /// 単一サービスのスナップショットを作成
    pub async fn check_service(&self, service: &ServiceDescriptor) -> ServiceStatusSnapshot {
        let gateway = self
            .probe
            .get(&service.health_url(), STATUS_PROBE_TIMEOUT)
            .await
            .to_gateway_result();

        if let Some(error) = &gateway.error {
            debug!(service_id = %service.id, error = %error, "Gateway unreachable");
        }

        let workers = self.fetch_workers(service).await;
        ServiceStatusSnapshot::new(&service.id, &service.name, gateway, workers)
    }

    /// 宣言済みワーカーの稼働状況を取得
    pub async fn fetch_workers(&self, service: &ServiceDescriptor) -> Vec<WorkerRuntimeStatus> {
        let outcome = self
            .probe
            .get(&service.worker_status_url(), STATUS_PROBE_TIMEOUT)
            .await;

        if !outcome.is_success() {
            debug!(
                service_id = %service.id,
                error = %outcome.error().unwrap_or_default(),
                "Worker manager status unavailable"
            );
            return unknown_workers(&service.workers);
        }

        // 200応答なら形式に関係なく running / stopped で判定する
        outcome
            .into_body()
            .map(|body| WorkerManagerReport::from_body(&body))
            .unwrap_or_default()
            .runtime_statuses(&service.workers)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
