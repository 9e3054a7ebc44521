//! CLI module for labdash
//!
//! Provides the command-line interface for the dashboard server.

pub mod check;
pub mod serve;

use clap::{Parser, Subcommand};
use labdash_common::error::CommonError;
use thiserror::Error;

/// CLIコマンドのエラー
#[derive(Debug, Error)]
pub enum CliError {
    /// 設定の読み込み・検証に失敗
    #[error(transparent)]
    Config(#[from] CommonError),
    /// サーバーの起動・実行に失敗
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
    /// 出力のシリアライズに失敗
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Homelab dashboard - live status aggregation for homelab services
#[derive(Parser, Debug)]
#[command(name = "labdash")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    LABDASH_CONFIG                   Config file path (default: config.yaml)
    LABDASH_HOST                     Bind address (overrides dashboard.host)
    LABDASH_PORT                     Listen port (overrides dashboard.port)
    LABDASH_STATUS_INTERVAL_SECS     Poll interval (overrides polling.status_interval_seconds)
    LABDASH_HEARTBEAT_INTERVAL_SECS  WebSocket ping interval
    LABDASH_LOG_LEVEL                Log level (default: info)
    LABDASH_LOG_DIR                  Also write daily-rotated logs to this directory
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the dashboard server
    Serve(serve::ServeArgs),
    /// Probe every configured service once and print the snapshots
    Check(check::CheckArgs),
}
