//! ヘルスチェックモニター
//!
//! 定期的に全サービスのゲートウェイとワーカーマネージャーを確認し、
//! スナップショットを `services` チャネルへ配信する。

pub mod service_checker;

pub use service_checker::HealthChecker;

use crate::events::HubError;
use thiserror::Error;

/// ヘルスチェックのエラー
///
/// プローブ失敗はデータとして扱うため、ここに現れるのは配信とパニックのみ。
#[derive(Debug, Error)]
pub enum HealthError {
    /// スナップショットを配信できなかった
    #[error("Failed to publish snapshot: {0}")]
    Publish(#[from] HubError),
    /// チェック中にパニックした
    #[error("Check panicked: {0}")]
    Panicked(String),
}
