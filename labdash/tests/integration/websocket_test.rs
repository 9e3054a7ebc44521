//! Integration Test: WebSocket購読
//!
//! 接続 → 購読制御 → チャネル配信の受信 → 切断時の登録解除

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use labdash::events::Channel;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

use crate::support::dashboard::{spawn_dashboard, wait_until};
use crate::support::upstream::{closed_port, dashboard_yaml, service_yaml};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(url: &str) -> Client {
    let (ws, _) = connect_async(url).await.expect("websocket connect failed");
    ws
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send failed");
}

/// 次のテキストフレームをJSONで受け取る（制御フレームは読み飛ばす）
async fn next_json(ws: &mut Client, timeout: Duration) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let message = tokio::time::timeout(remaining, ws.next()).await.ok()??.ok()?;
        if message.is_text() {
            return serde_json::from_str(message.to_text().ok()?).ok();
        }
    }
}

fn yaml() -> String {
    dashboard_yaml(&[service_yaml("llm", closed_port(), closed_port())], 5)
}

#[tokio::test]
async fn control_messages_are_acknowledged() {
    let dashboard = spawn_dashboard(&yaml()).await;
    let mut ws = connect(&dashboard.ws_url()).await;

    send_json(&mut ws, json!({"type": "subscribe", "channel": "memory"})).await;
    let ack = next_json(&mut ws, Duration::from_secs(2)).await.unwrap();
    assert_eq!(ack["type"], "subscribed");
    assert_eq!(ack["channel"], "memory");

    send_json(&mut ws, json!({"type": "ping"})).await;
    let pong = next_json(&mut ws, Duration::from_secs(2)).await.unwrap();
    assert_eq!(pong["type"], "pong");
    assert!(pong["timestamp"].is_number());

    dashboard.stop().await;
}

#[tokio::test]
async fn non_string_channel_is_still_acknowledged() {
    let dashboard = spawn_dashboard(&yaml()).await;
    let hub = dashboard.state.hub.clone();
    let mut ws = connect(&dashboard.ws_url()).await;

    send_json(&mut ws, json!({"type": "subscribe", "channel": 5})).await;
    let ack = next_json(&mut ws, Duration::from_secs(2)).await.unwrap();
    assert_eq!(ack["type"], "subscribed");
    assert_eq!(ack["channel"], "5");

    // 購読状態は変わらない（all のみ）
    let all = hub.subscribers(Channel::All).await;
    assert_eq!(all.len(), 1);
    assert_eq!(hub.channels_of(all[0]).await, vec![Channel::All]);

    dashboard.stop().await;
}

#[tokio::test]
async fn malformed_and_unknown_frames_are_ignored() {
    let dashboard = spawn_dashboard(&yaml()).await;
    let mut ws = connect(&dashboard.ws_url()).await;

    ws.send(Message::Text("{not json".to_string().into())).await.unwrap();
    send_json(&mut ws, json!({"type": "reboot"})).await;
    send_json(&mut ws, json!({"type": "ping"})).await;

    // 応答は ping に対するものだけ
    let reply = next_json(&mut ws, Duration::from_secs(2)).await.unwrap();
    assert_eq!(reply["type"], "pong");

    dashboard.stop().await;
}

#[tokio::test]
async fn memory_subscriber_only_sees_memory_updates() {
    let dashboard = spawn_dashboard(&yaml()).await;
    let hub = dashboard.state.hub.clone();
    let mut ws = connect(&dashboard.ws_url()).await;

    send_json(&mut ws, json!({"type": "unsubscribe", "channel": "all"})).await;
    assert_eq!(
        next_json(&mut ws, Duration::from_secs(2)).await.unwrap()["type"],
        "unsubscribed"
    );
    send_json(&mut ws, json!({"type": "subscribe", "channel": "memory"})).await;
    assert_eq!(
        next_json(&mut ws, Duration::from_secs(2)).await.unwrap()["type"],
        "subscribed"
    );

    hub.publish(Channel::Services, &json!({"service_id": "llm"}))
        .await
        .unwrap();
    hub.publish_named("unrelated", &json!({})).await.unwrap();
    hub.publish(Channel::Memory, &json!({"total_gb": 64.0}))
        .await
        .unwrap();

    let frame = next_json(&mut ws, Duration::from_secs(2)).await.unwrap();
    assert_eq!(frame["type"], "memory_update");
    assert_eq!(frame["data"]["total_gb"], 64.0);
    assert!(next_json(&mut ws, Duration::from_millis(200)).await.is_none());

    dashboard.stop().await;
}

#[tokio::test]
async fn closing_the_socket_unregisters_the_connection() {
    let dashboard = spawn_dashboard(&yaml()).await;
    let hub = dashboard.state.hub.clone();
    let mut ws = connect(&dashboard.ws_url()).await;

    assert!(
        wait_until(Duration::from_secs(2), || {
            let hub = hub.clone();
            async move { hub.connection_count().await == 1 }
        })
        .await
    );

    ws.close(None).await.unwrap();

    assert!(
        wait_until(Duration::from_secs(2), || {
            let hub = hub.clone();
            async move { hub.connection_count().await == 0 }
        })
        .await
    );
    assert!(hub.subscribers(Channel::All).await.is_empty());

    dashboard.stop().await;
}
