//! 共通型定義
//!
//! ポーリングで生成されるサービス・ワーカーのステータスレコード

use crate::config::WorkerDescriptor;
use serde::{Deserialize, Serialize};

/// サービス全体の稼働状態
///
/// ゲートウェイに到達できたかどうかだけで決まる（ワーカー状態は無関係）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceHealth {
    /// ゲートウェイが200を返した
    Healthy,
    /// ゲートウェイに到達できない、または200以外
    Unhealthy,
}

/// ゲートウェイのヘルスチェック結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayProbeResult {
    /// 200応答を得られたか
    pub reachable: bool,
    /// 応答までの時間（ミリ秒）。応答を受け取った場合のみ（200以外でも記録）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// エラー内容。到達不能または200以外のときのみ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// ワーカーのライフサイクル状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// ワーカーマネージャーの稼働一覧に存在する
    Running,
    /// ワーカーマネージャーには到達できたが稼働一覧に存在しない
    Stopped,
    /// ワーカーマネージャー自体に到達できない、または200以外
    Unknown,
}

/// ワーカーの実行時ステータス
///
/// `port` 以降のフィールドは `running` のときだけ埋まる。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerRuntimeStatus {
    /// エイリアス
    pub alias: String,
    /// 表示名
    pub name: String,
    /// 種別タグ
    #[serde(rename = "type")]
    pub worker_type: String,
    /// 状態
    pub status: WorkerState,
    /// 待ち受けポート
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// メモリ使用量（GB）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<f64>,
    /// 稼働時間（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<f64>,
    /// アイドル時間（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_seconds: Option<f64>,
}

impl WorkerRuntimeStatus {
    /// 実行時情報を持たないステータスを作成（stopped / unknown 用）
    pub fn without_runtime(worker: &WorkerDescriptor, status: WorkerState) -> Self {
        Self {
            alias: worker.alias.clone(),
            name: worker.name.clone(),
            worker_type: worker.worker_type.clone(),
            status,
            port: None,
            memory_gb: None,
            uptime_seconds: None,
            idle_seconds: None,
        }
    }

    /// 稼働中ワーカーのステータスを作成
    pub fn running(worker: &WorkerDescriptor, active: &ActiveWorker) -> Self {
        Self {
            alias: worker.alias.clone(),
            name: worker.name.clone(),
            worker_type: worker.worker_type.clone(),
            status: WorkerState::Running,
            port: active.port,
            memory_gb: active.memory_gb,
            uptime_seconds: active.uptime_seconds,
            idle_seconds: active.idle_seconds,
        }
    }
}

/// ワーカーマネージャーが報告する稼働ワーカー1件
///
/// 各サービスのワーカーマネージャーの形式はまちまちなので、読めない値は `None` として扱う。
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ActiveWorker {
    /// 待ち受けポート
    #[serde(default, deserialize_with = "lenient::port")]
    pub port: Option<u16>,
    /// メモリ使用量（GB）
    #[serde(default, deserialize_with = "lenient::number")]
    pub memory_gb: Option<f64>,
    /// 稼働時間（秒）
    #[serde(default, deserialize_with = "lenient::number")]
    pub uptime_seconds: Option<f64>,
    /// アイドル時間（秒）
    #[serde(default, deserialize_with = "lenient::number")]
    pub idle_seconds: Option<f64>,
}

/// ワーカーマネージャーが報告するホストメモリ
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryStatus {
    /// 総メモリ（GB）
    #[serde(default)]
    pub total_gb: f64,
    /// 空きメモリ（GB）
    #[serde(default)]
    pub available_gb: f64,
    /// 使用中メモリ（GB）
    #[serde(default)]
    pub used_gb: f64,
    /// 使用率（%）
    #[serde(default)]
    pub used_percent: f64,
}

/// ワーカーマネージャーの `/status` 応答
///
/// 200応答なら必ず作れる。`workers` が無い・オブジェクトでない応答は「稼働ワーカーなし」、
/// 個々のエントリは宣言済みエイリアスを引くときにだけ解釈する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerManagerReport {
    /// エイリアス → 稼働ワーカー（未解釈のまま）
    pub workers: serde_json::Map<String, serde_json::Value>,
    /// ホストメモリ（オブジェクトで報告された場合のみ）
    pub memory: Option<serde_json::Map<String, serde_json::Value>>,
}

impl WorkerManagerReport {
    /// 応答ボディから作成
    pub fn from_body(body: &serde_json::Value) -> Self {
        Self {
            workers: body
                .get("workers")
                .and_then(serde_json::Value::as_object)
                .cloned()
                .unwrap_or_default(),
            memory: body
                .get("memory")
                .and_then(serde_json::Value::as_object)
                .cloned(),
        }
    }

    /// 稼働一覧にあるワーカーの実行時情報（読めない値は `None`）
    pub fn active_worker(&self, alias: &str) -> Option<ActiveWorker> {
        self.workers
            .get(alias)
            .map(|entry| ActiveWorker::deserialize(entry).unwrap_or_default())
    }

    /// 宣言済みワーカーそれぞれを running / stopped に振り分ける
    pub fn runtime_statuses(&self, declared: &[WorkerDescriptor]) -> Vec<WorkerRuntimeStatus> {
        declared
            .iter()
            .map(|worker| match self.active_worker(&worker.alias) {
                Some(active) => WorkerRuntimeStatus::running(worker, &active),
                None => WorkerRuntimeStatus::without_runtime(worker, WorkerState::Stopped),
            })
            .collect()
    }

    /// 型付きのメモリ情報
    pub fn memory_status(&self) -> Option<MemoryStatus> {
        let memory = self.memory.clone()?;
        serde_json::from_value(serde_json::Value::Object(memory)).ok()
    }
}

/// 宣言済みワーカーをすべて unknown とする
pub fn unknown_workers(declared: &[WorkerDescriptor]) -> Vec<WorkerRuntimeStatus> {
    declared
        .iter()
        .map(|worker| WorkerRuntimeStatus::without_runtime(worker, WorkerState::Unknown))
        .collect()
}

/// 1サービス・1ティック分のステータススナップショット
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceStatusSnapshot {
    /// サービスID
    pub service_id: String,
    /// 表示名
    pub name: String,
    /// 全体状態（`gateway.reachable` から導出）
    pub status: ServiceHealth,
    /// ゲートウェイのチェック結果
    pub gateway: GatewayProbeResult,
    /// 宣言順のワーカーステータス
    pub workers: Vec<WorkerRuntimeStatus>,
    /// 取得時刻（UNIXエポック秒）
    pub timestamp: f64,
}

impl ServiceStatusSnapshot {
    /// ゲートウェイ結果とワーカー一覧からスナップショットを組み立てる
    pub fn new(
        service_id: impl Into<String>,
        name: impl Into<String>,
        gateway: GatewayProbeResult,
        workers: Vec<WorkerRuntimeStatus>,
    ) -> Self {
        let status = if gateway.reachable {
            ServiceHealth::Healthy
        } else {
            ServiceHealth::Unhealthy
        };
        Self {
            service_id: service_id.into(),
            name: name.into(),
            status,
            gateway,
            workers,
            timestamp: crate::unix_timestamp(),
        }
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?.as_f64())
    }

    pub(super) fn port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?
            .as_u64()
            .and_then(|p| u16::try_from(p).ok()))
    }
}
