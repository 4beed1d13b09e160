//! End-to-end tests: sample producer → listener → engine → CueStack

use crate::support::{wait_for_connection, FakeCueStack, ServerMode, WAIT};
use audiotrigger_core::domain::config::{ListenerConfig, TriggerConfig};
use audiotrigger_core::domain::dispatcher::Dispatcher;
use audiotrigger_core::domain::sample::Sample;
use audiotrigger_infra::net::{DeliveryChannel, RelayEngine, SampleListener};
use futures::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

fn loopback() -> ListenerConfig {
    ListenerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

async fn connect_producer(
    addr: SocketAddr,
) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>> {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/audio", addr))
        .await
        .unwrap();
    ws
}

// ============================================================================
// SAMPLE LISTENER
// ============================================================================

#[tokio::test]
async fn test_listener_forwards_valid_samples_only() {
    let (tx, mut rx) = mpsc::channel(16);
    let listener = SampleListener::bind(&loopback(), tx).await.unwrap();
    let mut producer = connect_producer(listener.local_addr()).await;

    for frame in [
        r#"{"volume": "loud", "id": "1", "scene": "scene1", "limit": -25}"#,
        r#"{"event": "hello", "data": {}}"#,
        r#"{"volume": -12, "id": "1", "scene": "scene1", "limit": -25}"#,
        r#"{"event": "audioInput", "data": {"volume": -40, "id": 2, "scene": "scene2", "limit": "-25"}}"#,
    ] {
        producer.send(Message::Text(frame.to_string())).await.unwrap();
    }

    let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, Sample::new("1", -12, "scene1", -25));
    let second = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(second, Sample::new("2", -40, "scene2", -25));
}

#[tokio::test]
async fn test_health_endpoint() {
    let (tx, _rx) = mpsc::channel(1);
    let listener = SampleListener::bind(&loopback(), tx).await.unwrap();

    let mut stream = TcpStream::connect(listener.local_addr()).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    tokio::time::timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#"{"status":"ok"}"#));
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let (tx, _rx) = mpsc::channel(1);
    let first = SampleListener::bind(&loopback(), tx.clone()).await.unwrap();

    let taken = ListenerConfig {
        host: "127.0.0.1".to_string(),
        port: first.local_addr().port(),
    };
    assert!(SampleListener::bind(&taken, tx).await.is_err());
}

// ============================================================================
// FULL RELAY
// ============================================================================

#[tokio::test]
async fn test_samples_become_cues() {
    let mut cuestack = FakeCueStack::start(ServerMode::KeepOpen).await;
    let channel = Arc::new(DeliveryChannel::spawn(cuestack.sink_config()));
    wait_for_connection(&channel, true).await;

    let (tx, rx) = mpsc::channel(64);
    let listener = SampleListener::bind(&loopback(), tx).await.unwrap();

    let settings = TriggerConfig {
        quiet_time_ms: 200,
        tick_period_ms: 20,
        ..TriggerConfig::default()
    };
    let dispatcher = Dispatcher::new(settings, channel.clone());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let engine = tokio::spawn(RelayEngine::new(dispatcher, rx).run(async move {
        let _ = stop_rx.await;
    }));

    let mut producer = connect_producer(listener.local_addr()).await;

    // Two meters share the scene; one loud meter is enough
    for frame in [
        r#"{"volume": -10, "id": "1", "scene": "stage", "limit": -25}"#,
        r#"{"volume": -50, "id": "2", "scene": "stage", "limit": -25}"#,
    ] {
        producer.send(Message::Text(frame.to_string())).await.unwrap();
    }
    assert_eq!(cuestack.next_message().await, r#"{"cue":"stage_active"}"#);

    // Keep pushing the same readings: no further traffic
    for _ in 0..10 {
        producer
            .send(Message::Text(
                r#"{"volume": -10, "id": "1", "scene": "stage", "limit": -25}"#.to_string(),
            ))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cuestack.assert_silent(Duration::from_millis(100)).await;

    producer
        .send(Message::Text(
            r#"{"volume": -30, "id": "1", "scene": "stage", "limit": -25}"#.to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(cuestack.next_message().await, r#"{"cue":"stage_inactive"}"#);
    cuestack.assert_silent(Duration::from_millis(300)).await;

    stop_tx.send(()).unwrap();
    let dispatcher = engine.await.unwrap();
    assert_eq!(dispatcher.registry().len(), 2);

    listener.shutdown();
    channel.shutdown();
}
