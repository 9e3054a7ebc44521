//! プローブクライアント
//!
//! 上流サービスへのHTTP呼び出しを1回だけ行い、結果を分類して返す。
//! ネットワーク障害も非200応答もすべてデータ（[`ProbeOutcome`]）として表現し、
//! この境界より外へエラーを伝播させない。

use labdash_common::types::GatewayProbeResult;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::{Duration, Instant};

/// ステータス取得系プローブのタイムアウト
pub const STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// ゲートウェイのシステムステータス中継のタイムアウト
pub const GATEWAY_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// 停止・退避などワーカー操作のタイムアウト
pub const ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// ワーカー起動のタイムアウト（モデルロードを含むため長い）
pub const SPAWN_TIMEOUT: Duration = Duration::from_secs(120);

/// タイムアウト時のエラー文字列
pub const TIMEOUT_ERROR: &str = "timeout";

/// 接続失敗時のエラー文字列
pub const CONNECTION_REFUSED_ERROR: &str = "connection refused";

/// 1回のプローブ結果
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// 200応答
    Success {
        /// 応答までの時間（ミリ秒）
        latency_ms: f64,
        /// JSONとして読めた場合のボディ
        body: Option<Value>,
    },
    /// 200以外の応答
    HttpStatus {
        /// HTTPステータスコード
        status: u16,
        /// 応答までの時間（ミリ秒）
        latency_ms: f64,
        /// JSONとして読めた場合のボディ
        body: Option<Value>,
    },
    /// 応答がないままタイムアウト
    Timeout,
    /// 接続を確立できなかった
    ConnectionRefused,
    /// その他のトランスポート障害
    Transport(String),
}

impl ProbeOutcome {
    /// 200応答だったか
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }

    /// 応答を受け取った場合の所要時間
    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            ProbeOutcome::Success { latency_ms, .. }
            | ProbeOutcome::HttpStatus { latency_ms, .. } => Some(*latency_ms),
            _ => None,
        }
    }

    /// 応答ボディ（JSON）
    pub fn body(&self) -> Option<&Value> {
        match self {
            ProbeOutcome::Success { body, .. } | ProbeOutcome::HttpStatus { body, .. } => {
                body.as_ref()
            }
            _ => None,
        }
    }

    /// 応答ボディ（JSON）の所有権を取り出す
    pub fn into_body(self) -> Option<Value> {
        match self {
            ProbeOutcome::Success { body, .. } | ProbeOutcome::HttpStatus { body, .. } => body,
            _ => None,
        }
    }

    /// 失敗時のエラー文字列（成功時は `None`）
    pub fn error(&self) -> Option<String> {
        match self {
            ProbeOutcome::Success { .. } => None,
            ProbeOutcome::HttpStatus { status, .. } => Some(format!("HTTP {}", status)),
            ProbeOutcome::Timeout => Some(TIMEOUT_ERROR.to_string()),
            ProbeOutcome::ConnectionRefused => Some(CONNECTION_REFUSED_ERROR.to_string()),
            ProbeOutcome::Transport(message) => Some(message.clone()),
        }
    }

    /// ゲートウェイのヘルスチェック結果に変換
    pub fn to_gateway_result(&self) -> GatewayProbeResult {
        GatewayProbeResult {
            reachable: self.is_success(),
            latency_ms: self.latency_ms(),
            error: self.error(),
        }
    }
}

/// プローブクライアント
///
/// 共有の`reqwest::Client`を保持するだけなので、クローンして使い回してよい。
#[derive(Debug, Clone, Default)]
pub struct ProbeClient {
    client: Client,
}

impl ProbeClient {
    /// 新しいプローブクライアントを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// GETでプローブ
    pub async fn get(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        self.execute(self.client.get(url).timeout(timeout)).await
    }

    /// POSTでプローブ（ワーカー操作用）
    pub async fn post(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        self.execute(self.client.post(url).timeout(timeout)).await
    }

    async fn execute(&self, request: RequestBuilder) -> ProbeOutcome {
        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };
        let latency_ms = round_ms(start.elapsed());
        let status = response.status().as_u16();
        let body = read_json_body(response).await;

        if status == 200 {
            ProbeOutcome::Success { latency_ms, body }
        } else {
            ProbeOutcome::HttpStatus {
                status,
                latency_ms,
                body,
            }
        }
    }
}

/// 応答ボディをJSONとして読む（空・不正なら `None`）
async fn read_json_body(response: reqwest::Response) -> Option<Value> {
    let bytes = response.bytes().await.ok()?;
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(&bytes).ok()
}

fn classify_error(error: &reqwest::Error) -> ProbeOutcome {
    if error.is_timeout() {
        ProbeOutcome::Timeout
    } else if error.is_connect() {
        ProbeOutcome::ConnectionRefused
    } else {
        ProbeOutcome::Transport(error.to_string())
    }
}

/// ミリ秒に変換し小数第2位で丸める
fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}
