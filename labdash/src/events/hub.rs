//! ブロードキャストハブ
//!
//! 接続ごとの送信キューとチャネル購読を管理し、レコードを購読者へファンアウトする。
//!
//! - 接続は `connect` で登録され、自動的に `all` を購読する
//! - チャネル `c` への配信先は「`c` の購読者 ∪ `all` の購読者」（重複なし）
//! - 送信キューが満杯、または受信側が閉じている接続は配信時に切断扱いになる

use super::{Channel, ConnectionId};
use labdash_common::protocol::{ControlMessage, Envelope, DEFAULT_CHANNEL};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// 接続ごとの送信キュー容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// シリアライズ済みの送信フレーム（全購読者で共有）
pub type Frame = Arc<str>;

/// ハブのエラー
#[derive(Debug, Error)]
pub enum HubError {
    /// ペイロードをJSONにできなかった
    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 登録済みクライアントのハンドル
///
/// `frames` から受け取ったフレームをトランスポートへ書き出すのは呼び出し側の責務。
#[derive(Debug)]
pub struct ClientHandle {
    /// 接続ID
    pub id: ConnectionId,
    /// このクライアント宛てのフレーム
    pub frames: mpsc::Receiver<Frame>,
}

#[derive(Debug, Default)]
struct HubState {
    connections: HashMap<ConnectionId, mpsc::Sender<Frame>>,
    subscriptions: HashMap<Channel, HashSet<ConnectionId>>,
}

impl HubState {
    fn remove(&mut self, id: ConnectionId) -> bool {
        let existed = self.connections.remove(&id).is_some();
        for members in self.subscriptions.values_mut() {
            members.remove(&id);
        }
        existed
    }

    /// チャネルの配信先（`all` との和集合）
    fn recipients(&self, channel: Channel) -> HashSet<ConnectionId> {
        let mut recipients: HashSet<ConnectionId> = self
            .subscriptions
            .get(&Channel::All)
            .cloned()
            .unwrap_or_default();
        if channel != Channel::All {
            if let Some(members) = self.subscriptions.get(&channel) {
                recipients.extend(members.iter().copied());
            }
        }
        recipients
    }
}

/// ブロードキャストハブ
///
/// クローンは同じ状態を共有する。
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    state: Arc<RwLock<HubState>>,
    queue_capacity: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    /// 新しいハブを作成
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// 送信キュー容量を指定して作成
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState::default())),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// クライアントを登録し `all` を購読させる
    pub async fn connect(&self) -> ClientHandle {
        let (sender, frames) = mpsc::channel(self.queue_capacity);
        let id = ConnectionId::new();

        let total = {
            let mut state = self.state.write().await;
            state.connections.insert(id, sender);
            state.subscriptions.entry(Channel::All).or_default().insert(id);
            state.connections.len()
        };

        info!(connection = %id, total, "Dashboard client connected");
        ClientHandle { id, frames }
    }

    /// クライアントを登録解除（何度呼んでもよい）
    ///
    /// 登録されていた場合は `true`。
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let (existed, total) = {
            let mut state = self.state.write().await;
            let existed = state.remove(id);
            (existed, state.connections.len())
        };
        if existed {
            info!(connection = %id, total, "Dashboard client disconnected");
        }
        existed
    }

    /// チャネルを購読
    ///
    /// 既に切断済みの接続は何もしない（`false`）。
    pub async fn subscribe(&self, id: ConnectionId, channel: Channel) -> bool {
        let mut state = self.state.write().await;
        if !state.connections.contains_key(&id) {
            return false;
        }
        state.subscriptions.entry(channel).or_default().insert(id);
        debug!(connection = %id, channel = %channel, "Subscribed");
        true
    }

    /// チャネルの購読を解除
    pub async fn unsubscribe(&self, id: ConnectionId, channel: Channel) -> bool {
        let mut state = self.state.write().await;
        let removed = state
            .subscriptions
            .get_mut(&channel)
            .map(|members| members.remove(&id))
            .unwrap_or(false);
        if removed {
            debug!(connection = %id, channel = %channel, "Unsubscribed");
        }
        removed
    }

    /// チャネルへレコードを配信
    ///
    /// `<channel>_update` エンベロープに包み、配信できた接続数を返す。
    pub async fn publish<T: Serialize>(
        &self,
        channel: Channel,
        payload: &T,
    ) -> Result<usize, HubError> {
        let data = serde_json::to_value(payload)?;
        let frame = encode(&Envelope::update(channel.as_str(), data))?;

        let (delivered, failed) = {
            let state = self.state.read().await;
            let recipients = state.recipients(channel);
            fan_out(&state, recipients.iter().copied(), &frame)
        };
        self.prune(failed).await;

        debug!(channel = %channel, delivered, "Published update");
        Ok(delivered)
    }

    /// チャネル名を指定して配信（未知の名前は誰にも届かない）
    pub async fn publish_named<T: Serialize>(
        &self,
        channel: &str,
        payload: &T,
    ) -> Result<usize, HubError> {
        match channel.parse::<Channel>() {
            Ok(channel) => self.publish(channel, payload).await,
            Err(e) => {
                debug!(error = %e, "Dropping publish to unknown channel");
                Ok(0)
            }
        }
    }

    /// 購読に関係なく全接続へ送る
    pub async fn broadcast_all<T: Serialize>(
        &self,
        kind: &str,
        payload: &T,
    ) -> Result<usize, HubError> {
        let data = serde_json::to_value(payload)?;
        let frame = encode(&Envelope::message(kind, data))?;

        let (delivered, failed) = {
            let state = self.state.read().await;
            fan_out(&state, state.connections.keys().copied(), &frame)
        };
        self.prune(failed).await;
        Ok(delivered)
    }

    /// 1つの接続へエンベロープを送る
    ///
    /// 送れなかった接続は切断扱いになり `false` を返す。
    pub async fn send_to(&self, id: ConnectionId, envelope: &Envelope) -> Result<bool, HubError> {
        let frame = encode(envelope)?;
        let (delivered, failed) = {
            let state = self.state.read().await;
            fan_out(&state, std::iter::once(id), &frame)
        };
        self.prune(failed).await;
        Ok(delivered == 1)
    }

    /// クライアントからの制御メッセージを処理
    ///
    /// 購読・解除には常に応答を返す。未知のチャネル名は購読状態を変えない。
    pub async fn handle_control_message(
        &self,
        id: ConnectionId,
        message: ControlMessage,
    ) -> Result<(), HubError> {
        match message {
            ControlMessage::Subscribe { channel } => {
                let name = channel.as_deref().unwrap_or(DEFAULT_CHANNEL);
                match name.parse::<Channel>() {
                    Ok(channel) => {
                        self.subscribe(id, channel).await;
                    }
                    Err(e) => debug!(connection = %id, error = %e, "Ignoring subscribe"),
                }
                self.send_to(id, &Envelope::subscribed(name)).await?;
            }
            ControlMessage::Unsubscribe { channel } => {
                let name = channel.as_deref().unwrap_or(DEFAULT_CHANNEL);
                match name.parse::<Channel>() {
                    Ok(channel) => {
                        self.unsubscribe(id, channel).await;
                    }
                    Err(e) => debug!(connection = %id, error = %e, "Ignoring unsubscribe"),
                }
                self.send_to(id, &Envelope::unsubscribed(name)).await?;
            }
            ControlMessage::Ping => {
                self.send_to(id, &Envelope::pong()).await?;
            }
            ControlMessage::Unknown => {
                debug!(connection = %id, "Ignoring unknown control message");
            }
        }
        Ok(())
    }

    /// 登録中の接続数
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// 接続が登録中か
    pub async fn is_connected(&self, id: ConnectionId) -> bool {
        self.state.read().await.connections.contains_key(&id)
    }

    /// チャネルを直接購読している接続
    pub async fn subscribers(&self, channel: Channel) -> Vec<ConnectionId> {
        let state = self.state.read().await;
        let mut ids: Vec<_> = state
            .subscriptions
            .get(&channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// 接続が購読しているチャネル
    pub async fn channels_of(&self, id: ConnectionId) -> Vec<Channel> {
        let state = self.state.read().await;
        let mut channels: Vec<_> = state
            .subscriptions
            .iter()
            .filter(|(_, members)| members.contains(&id))
            .map(|(channel, _)| *channel)
            .collect();
        channels.sort();
        channels
    }

    async fn prune(&self, failed: Vec<(ConnectionId, &'static str)>) {
        if failed.is_empty() {
            return;
        }
        let mut state = self.state.write().await;
        for (id, reason) in failed {
            if state.remove(id) {
                warn!(connection = %id, reason, "Dropping dashboard client");
            }
        }
    }
}

fn encode(envelope: &Envelope) -> Result<Frame, HubError> {
    Ok(Arc::from(serde_json::to_string(envelope)?))
}

/// 指定した接続へフレームを送り、(配信数, 失敗した接続) を返す
fn fan_out(
    state: &HubState,
    recipients: impl Iterator<Item = ConnectionId>,
    frame: &Frame,
) -> (usize, Vec<(ConnectionId, &'static str)>) {
    let mut delivered = 0;
    let mut failed = Vec::new();
    for id in recipients {
        let Some(sender) = state.connections.get(&id) else {
            continue;
        };
        match sender.try_send(Arc::clone(frame)) {
            Ok(()) => delivered += 1,
            Err(mpsc::error::TrySendError::Full(_)) => failed.push((id, "send queue full")),
            Err(mpsc::error::TrySendError::Closed(_)) => failed.push((id, "receiver closed")),
        }
    }
    (delivered, failed)
}
