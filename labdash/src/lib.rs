//! Homelab dashboard server
//!
//! 複数のホームラボサービスの稼働状況を集約し、WebSocketでリアルタイム配信する

#![warn(missing_docs)]

/// REST API / WebSocketハンドラー
pub mod api;

/// CLIインターフェース
pub mod cli;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// ダッシュボードイベント配信
pub mod events;

/// ヘルスチェック監視
pub mod health;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 上流サービスへの単発HTTPプローブ
pub mod probe;

/// サービスディレクトリ
pub mod registry;

/// axumサーバー起動
pub mod server;

/// Shutdown controller
pub mod shutdown;

use labdash_common::config::DashboardConfig;
use std::time::Duration;

/// アプリケーション状態
///
/// プロセス起動時に一度だけ組み立て、ハンドラーへはクローンで渡す。
#[derive(Clone)]
pub struct AppState {
    /// サービスディレクトリ
    pub directory: registry::ServiceDirectory,
    /// 共有プローブクライアント（接続プーリング有効）
    pub probe: probe::ProbeClient,
    /// ブロードキャストハブ
    pub hub: events::BroadcastHub,
    /// ヘルスチェッカー
    pub checker: health::HealthChecker,
    /// WebSocketのPing送信間隔
    pub heartbeat_interval: Duration,
    /// Cooperative shutdown controller
    pub shutdown: shutdown::ShutdownController,
}

impl AppState {
    /// 設定から各コンポーネントを組み立てる
    pub fn new(config: &DashboardConfig) -> Self {
        let directory = registry::ServiceDirectory::from_config(config);
        let probe = probe::ProbeClient::new();
        let hub = events::BroadcastHub::new();
        let checker = health::HealthChecker::new(directory.clone(), probe.clone(), hub.clone())
            .with_interval(Duration::from_secs(config.polling.status_interval_seconds));

        Self {
            directory,
            probe,
            hub,
            checker,
            heartbeat_interval: Duration::from_secs(config.websocket.heartbeat_interval_seconds),
            shutdown: shutdown::ShutdownController::default(),
        }
    }
}
