//! Homelab Dashboard 共通ライブラリ
//!
//! ダッシュボードサーバーとCLIで共有する設定・型・プロトコル定義

#![warn(missing_docs)]

/// 設定管理
pub mod config;

/// エラー型定義
pub mod error;

/// 通信プロトコル定義
pub mod protocol;

/// 共通型定義
pub mod types;

/// 現在時刻をUNIXエポック秒（小数部あり）で返す
///
/// ダッシュボードのエンベロープやスナップショットの `timestamp` フィールドはすべてこの形式。
pub fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
