//! 統合テスト用ユーティリティ

pub mod dashboard;
pub mod upstream;
