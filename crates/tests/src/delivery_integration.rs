//! Integration tests for the reconnecting delivery channel
//!
//! A local stand-in for CueStack records the frames the channel writes.

use crate::support::{wait_for_connection, FakeCueStack, ServerMode, WAIT};
use audiotrigger_core::domain::config::SinkConfig;
use audiotrigger_core::domain::cue::{CueSink, Delivery, OutboundMessage};
use audiotrigger_infra::net::{ConnectionEvent, DeliveryChannel};
use std::time::Duration;
use tokio::net::TcpListener;

// ============================================================================
// DELIVERY
// ============================================================================

#[tokio::test]
async fn test_cue_is_written_as_json() {
    let mut server = FakeCueStack::start(ServerMode::KeepOpen).await;
    let channel = DeliveryChannel::spawn(server.sink_config());
    wait_for_connection(&channel, true).await;

    let delivery = channel.send(&OutboundMessage::new("scene1_active")).unwrap();
    assert_eq!(delivery, Delivery::Sent);
    assert_eq!(server.next_message().await, r#"{"cue":"scene1_active"}"#);

    channel.send(&OutboundMessage::new("scene1_inactive")).unwrap();
    assert_eq!(server.next_message().await, r#"{"cue":"scene1_inactive"}"#);
}

#[tokio::test]
async fn test_send_without_server_is_dropped() {
    // Grab a free port and release it so nothing listens there
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let channel = DeliveryChannel::spawn(SinkConfig {
        host: "127.0.0.1".to_string(),
        port,
        reconnect_delay_ms: 20,
        connect_timeout_ms: 200,
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!channel.is_connected());
    assert_eq!(
        channel.send(&OutboundMessage::new("s1_active")).unwrap(),
        Delivery::Dropped
    );
}

// ============================================================================
// RECONNECTION
// ============================================================================

#[tokio::test]
async fn test_reconnects_and_does_not_replay_dropped_cues() {
    let mut server = FakeCueStack::start(ServerMode::CloseAfterFirst).await;
    let channel = DeliveryChannel::spawn(server.sink_config());

    wait_for_connection(&channel, true).await;
    assert_eq!(
        channel.send(&OutboundMessage::new("a_active")).unwrap(),
        Delivery::Sent
    );
    assert_eq!(server.next_message().await, r#"{"cue":"a_active"}"#);

    // The server hangs up; the channel waits 300 ms before reconnecting
    wait_for_connection(&channel, false).await;
    assert_eq!(
        channel.send(&OutboundMessage::new("a_inactive")).unwrap(),
        Delivery::Dropped
    );

    wait_for_connection(&channel, true).await;
    channel.send(&OutboundMessage::new("b_active")).unwrap();
    assert_eq!(server.next_message().await, r#"{"cue":"b_active"}"#);
}

#[tokio::test]
async fn test_connection_events_are_published() {
    // Bind first so the handshake can only finish once the server accepts
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let channel = DeliveryChannel::spawn(SinkConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        reconnect_delay_ms: 50,
        connect_timeout_ms: 1000,
    });
    let mut events = channel.subscribe();

    let mut server = FakeCueStack::serve(listener, ServerMode::CloseAfterFirst);

    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, ConnectionEvent::Connected);

    channel.send(&OutboundMessage::new("x_active")).unwrap();
    server.next_message().await;

    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, ConnectionEvent::Disconnected);

    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, ConnectionEvent::Connected);
}

#[tokio::test]
async fn test_shutdown_stops_delivery() {
    let mut server = FakeCueStack::start(ServerMode::KeepOpen).await;
    let channel = DeliveryChannel::spawn(server.sink_config());
    wait_for_connection(&channel, true).await;

    channel.shutdown();
    assert!(!channel.is_connected());
    assert_eq!(
        channel.send(&OutboundMessage::new("late_active")).unwrap(),
        Delivery::Dropped
    );
    server.assert_silent(Duration::from_millis(200)).await;
}
