//! プロセス内からのシャットダウン要求
//!
//! OSシグナルを送らずにサーバーを止めるためのハンドル。`server::serve` が
//! Ctrl+C / SIGTERM と並べて待機する。

use tokio_util::sync::CancellationToken;

/// シャットダウン要求ハンドル
///
/// クローンは同じ要求を共有する。一度要求すると取り消せない。
#[derive(Clone, Debug, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    /// 要求済みか
    pub fn is_shutdown_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// シャットダウンを要求（2回目以降は何もしない）
    pub fn request_shutdown(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("Shutdown requested in-process");
        }
        self.token.cancel();
    }

    /// 要求されるまで待つ
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}
