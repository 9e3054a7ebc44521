//! check サブコマンド
//!
//! 設定を検証し、全サービスを1回だけ確認してスナップショットをJSONで出力します。

use super::CliError;
use crate::config::load_dashboard_config;
use crate::AppState;
use clap::Args;
use labdash_common::types::ServiceStatusSnapshot;
use std::path::PathBuf;

/// check サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Config file path
    #[arg(short, long, default_value = crate::config::DEFAULT_CONFIG_PATH, env = "LABDASH_CONFIG")]
    pub config: PathBuf,
}

/// 1回分のスナップショットを取得する
pub async fn collect(args: &CheckArgs) -> Result<Vec<ServiceStatusSnapshot>, CliError> {
    let config = load_dashboard_config(&args.config)?;
    let state = AppState::new(&config);
    Ok(state.checker.snapshot_all().await)
}

/// スナップショットを標準出力へ書き出す
pub async fn execute(args: &CheckArgs) -> Result<(), CliError> {
    let snapshots = collect(args).await?;
    println!("{}", serde_json::to_string_pretty(&snapshots)?);
    Ok(())
}
