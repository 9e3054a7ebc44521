//! ダッシュボードイベント配信
//!
//! ポーリング結果などのレコードを、チャネル単位の購読に従って
//! 接続中のWebSocketクライアントへファンアウトする。

pub mod hub;

pub use hub::{BroadcastHub, ClientHandle, Frame, HubError};

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 配信チャネル
///
/// チャネルは固定集合。`All` の購読者は全チャネルの配信を受け取る。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// サービスステータス
    Services,
    /// ワーカー状態
    Workers,
    /// メモリ情報
    Memory,
    /// 全チャネル
    All,
}

impl Channel {
    /// 予約済みチャネルすべて
    pub const RESERVED: [Channel; 4] = [
        Channel::Services,
        Channel::Workers,
        Channel::Memory,
        Channel::All,
    ];

    /// チャネル名
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Services => "services",
            Channel::Workers => "workers",
            Channel::Memory => "memory",
            Channel::All => "all",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知のチャネル名
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "services" => Ok(Channel::Services),
            "workers" => Ok(Channel::Workers),
            "memory" => Ok(Channel::Memory),
            "all" => Ok(Channel::All),
            other => Err(UnknownChannel(other.to_string())),
        }
    }
}

/// 接続ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 新しい接続IDを採番
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ログで追いやすいよう先頭8桁のみ
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}
