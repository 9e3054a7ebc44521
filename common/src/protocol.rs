//! 通信プロトコル定義
//!
//! ダッシュボードクライアント↔サーバー間のWebSocketフレームと、REST APIのレスポンス型

use crate::types::{MemoryStatus, ServiceStatusSnapshot, WorkerRuntimeStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// チャネル未指定時に使うチャネル名
pub const DEFAULT_CHANNEL: &str = "all";

/// クライアントから届く制御メッセージ
///
/// 未知の `type` は [`ControlMessage::Unknown`] になり、サーバー側で黙って無視される。
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// チャネル購読
    Subscribe {
        /// 対象チャネル（省略時は `all`）
        #[serde(default, deserialize_with = "channel_name")]
        channel: Option<String>,
    },
    /// チャネル購読解除
    Unsubscribe {
        /// 対象チャネル（省略時は `all`）
        #[serde(default, deserialize_with = "channel_name")]
        channel: Option<String>,
    },
    /// キープアライブ
    Ping,
    /// 未対応のメッセージ種別
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// JSONテキストフレームを解析
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// チャネル名を文字列として読む
///
/// 文字列以外の値もJSON表記のまま名前として扱い、応答は返せるようにする。
fn channel_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name),
        Some(other) => Some(other.to_string()),
    })
}

/// サーバーから送るエンベロープ
///
/// - ブロードキャスト: `{"type": "<channel>_update", "timestamp", "data"}`
/// - 購読応答: `{"type": "subscribed" | "unsubscribed", "channel", "timestamp"}`
/// - キープアライブ応答: `{"type": "pong", "timestamp"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// メッセージ種別
    #[serde(rename = "type")]
    pub kind: String,
    /// 送信時刻（UNIXエポック秒）
    pub timestamp: f64,
    /// 購読応答の対象チャネル
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// ペイロード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    fn new(kind: impl Into<String>, channel: Option<String>, data: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            timestamp: crate::unix_timestamp(),
            channel,
            data,
        }
    }

    /// チャネル更新 (`<channel>_update`)
    pub fn update(channel: &str, data: Value) -> Self {
        Self::new(format!("{channel}_update"), None, Some(data))
    }

    /// 任意種別のメッセージ
    pub fn message(kind: impl Into<String>, data: Value) -> Self {
        Self::new(kind, None, Some(data))
    }

    /// 購読応答
    pub fn subscribed(channel: &str) -> Self {
        Self::new("subscribed", Some(channel.to_string()), None)
    }

    /// 購読解除応答
    pub fn unsubscribed(channel: &str) -> Self {
        Self::new("unsubscribed", Some(channel.to_string()), None)
    }

    /// キープアライブ応答
    pub fn pong() -> Self {
        Self::new("pong", None, None)
    }
}

/// REST: サービスステータス（スナップショット＋表示用メタデータ）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceStatus {
    /// ポーリングと同じ形式のスナップショット
    #[serde(flatten)]
    pub snapshot: ServiceStatusSnapshot,
    /// 説明
    pub description: String,
    /// UIアイコン名
    pub icon: String,
}

/// REST: サービス一覧
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceListResponse {
    /// 全サービスのステータス（設定順）
    pub services: Vec<ServiceStatus>,
    /// 取得時刻
    pub timestamp: f64,
}

/// REST: ワーカー一覧
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerListResponse {
    /// 宣言順のワーカーステータス
    pub workers: Vec<WorkerRuntimeStatus>,
}

/// ワーカー操作の種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkerAction {
    /// 起動
    Spawn,
    /// 停止
    Stop,
    /// ゲートウェイ経由の強制退避
    Evict,
}

impl WorkerAction {
    /// 文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerAction::Spawn => "spawn",
            WorkerAction::Stop => "stop",
            WorkerAction::Evict => "evict",
        }
    }

    /// 成功メッセージ用の過去分詞
    pub fn past_tense(&self) -> &'static str {
        match self {
            WorkerAction::Spawn => "spawned",
            WorkerAction::Stop => "stopped",
            WorkerAction::Evict => "evicted",
        }
    }
}

/// REST: ワーカー操作結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerActionResponse {
    /// 上流が200を返したか
    pub success: bool,
    /// 人間向けメッセージ
    pub message: String,
    /// 対象エイリアス
    pub worker_alias: String,
    /// 操作種別
    pub action: WorkerAction,
    /// 上流の応答ボディ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// REST: 一括操作結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    /// 上流が200を返したか
    pub success: bool,
    /// 人間向けメッセージ
    pub message: String,
}

/// REST: ワーカーマネージャーの状態
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerManagerStatus {
    /// 最初にこのワーカーマネージャーを参照したサービスID
    pub service_id: String,
    /// 到達できたか
    pub reachable: bool,
    /// 稼働ワーカー数
    pub workers_count: usize,
    /// ホストメモリ（報告がある場合）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStatus>,
    /// エラー内容
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// REST: システム全体の概要
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemOverview {
    /// 取得時刻
    pub timestamp: f64,
    /// サービス数
    pub services_count: usize,
    /// 正常なサービス数
    pub healthy_services: usize,
    /// 異常なサービス数
    pub unhealthy_services: usize,
    /// 宣言済みワーカー総数
    pub total_workers: usize,
    /// 稼働中ワーカー数（ワーカーマネージャー単位で重複排除）
    pub running_workers: usize,
    /// ワーカーマネージャーごとの状態
    pub worker_managers: Vec<WorkerManagerStatus>,
}

/// REST: メモリ情報の提供元1件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemorySource {
    /// ワーカーマネージャーURL
    pub source: String,
    /// サービスID
    pub service_id: String,
    /// ワーカーマネージャーが返したメモリ情報そのまま
    #[serde(flatten)]
    pub memory: serde_json::Map<String, Value>,
}

/// REST: メモリ情報一覧
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryReport {
    /// 取得時刻
    pub timestamp: f64,
    /// 提供元ごとのメモリ情報
    pub memory_sources: Vec<MemorySource>,
}
