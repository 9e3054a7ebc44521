//! serve サブコマンド
//!
//! ダッシュボードサーバーを起動し、終了時にポーリングを停止します。

use super::CliError;
use crate::config::{config_path, load_dashboard_config};
use crate::{server, AppState};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Config file path
    #[arg(short, long, default_value = crate::config::DEFAULT_CONFIG_PATH, env = "LABDASH_CONFIG")]
    pub config: PathBuf,

    /// Bind address (overrides the config file)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Listen port (overrides the config file)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            config: config_path(),
            host: None,
            port: None,
        }
    }
}

/// サーバーを起動する（シャットダウンまで戻らない）
pub async fn execute(args: &ServeArgs) -> Result<(), CliError> {
    let mut config = load_dashboard_config(&args.config)?;
    if let Some(host) = &args.host {
        config.dashboard.host = host.clone();
    }
    if let Some(port) = args.port {
        config.dashboard.port = port;
    }

    info!(
        config = %args.config.display(),
        services = config.services.len(),
        "Loaded dashboard configuration"
    );

    let state = AppState::new(&config);
    state.checker.start().await;

    let bind_addr = format!("{}:{}", config.dashboard.host, config.dashboard.port);
    let result = server::run(state.clone(), &bind_addr).await;

    state.checker.stop().await;
    result?;
    Ok(())
}
