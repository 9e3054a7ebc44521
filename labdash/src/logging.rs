//! ロギング初期化ユーティリティ
//!
//! - フィルター: `RUST_LOG` → `LABDASH_LOG_LEVEL` → `info` の順で採用
//! - 出力: 標準エラー、`LABDASH_LOG_DIR` 指定時は日次ローテーションのファイルにも出力

use crate::config::{get_env, get_env_or};
use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// デフォルトのログレベル
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// ログファイル名のプレフィックス
pub const LOG_FILE_PREFIX: &str = "labdash.log";

/// ロギング初期化のエラー
#[derive(Debug, Error)]
pub enum LoggingError {
    /// フィルター指定が不正
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    /// ログディレクトリを作成できない
    #[error("Failed to prepare log directory: {0}")]
    Io(#[from] std::io::Error),
    /// グローバルサブスクライバーが既に設定済み
    #[error("Failed to install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// ロギングのガード
///
/// ファイル出力の非同期ライターはこのガードが破棄されるとフラッシュされる。
/// プロセス終了まで保持すること。
#[must_use]
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// 使用するログレベル指定
pub fn log_level() -> String {
    get_env_or("LABDASH_LOG_LEVEL", DEFAULT_LOG_LEVEL)
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(level)?),
    }
}

fn file_writer(dir: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), LoggingError> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

/// グローバルなtracingサブスクライバーを設定する
pub fn init() -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter(&log_level())?;

    let (file_layer, file_guard) = match get_env("LABDASH_LOG_DIR") {
        Some(dir) => {
            let (writer, guard) = file_writer(Path::new(&dir))?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;

    Ok(LoggingGuard { _file: file_guard })
}
