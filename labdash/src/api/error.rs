//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング。ボディは `{"detail": "..."}`。

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// REST APIのエラー
#[derive(Debug, Error)]
pub enum ApiError {
    /// 未登録のサービス
    #[error("Service not found: {0}")]
    ServiceNotFound(String),
    /// 未宣言のワーカー
    #[error("Worker not found: {0}")]
    WorkerNotFound(String),
    /// 上流に到達できない・応答が使えない
    #[error("{0}")]
    Unavailable(String),
    /// 上流がタイムアウトした
    #[error("{0}")]
    Timeout(String),
}

impl ApiError {
    /// 対応するHTTPステータス
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ServiceNotFound(_) | ApiError::WorkerNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Upstream request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
