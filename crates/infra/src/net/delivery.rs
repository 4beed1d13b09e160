//! Reconnecting WebSocket delivery channel to the cue-automation service
//!
//! A background task owns the socket. It connects, pumps outbound cues until
//! the connection drops, then waits `reconnect_delay` and tries again, forever.
//! The [`CueSink`] side only checks an atomic flag and hands the serialized
//! message to the task; nothing is queued across disconnects.

use audiotrigger_core::domain::config::SinkConfig;
use audiotrigger_core::domain::cue::{CueSink, Delivery, OutboundMessage, Result, SinkError};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

/// Room for cues handed over within one tick
const OUTBOUND_CAPACITY: usize = 64;

/// Connection lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
}

/// Why a live connection ended
#[derive(Debug)]
enum Disconnect {
    ClosedByPeer,
    ReadFailed(String),
    WriteFailed(String),
    Shutdown,
}

/// Persistent, auto-reconnecting outbound connection
pub struct DeliveryChannel {
    url: String,
    connected: Arc<AtomicBool>,
    outbound: mpsc::Sender<String>,
    events: broadcast::Sender<ConnectionEvent>,
    task: JoinHandle<()>,
}

impl DeliveryChannel {
    /// Start the connection task; must be called from within a tokio runtime
    pub fn spawn(config: SinkConfig) -> Self {
        let url = config.url();
        let connected = Arc::new(AtomicBool::new(false));
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (events, _events_rx) = broadcast::channel(16);

        info!(url = %url, "Starting cue delivery channel");

        let task = tokio::spawn(run_connection(
            config,
            connected.clone(),
            outbound_rx,
            events.clone(),
        ));

        Self {
            url,
            connected,
            outbound,
            events,
            task,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Subscribe to connect/disconnect events
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Stop reconnecting and close the socket
    pub fn shutdown(&self) {
        if !self.task.is_finished() {
            info!(url = %self.url, "Stopping cue delivery channel");
        }
        self.task.abort();
        self.connected.store(false, Ordering::Release);
    }
}

impl CueSink for DeliveryChannel {
    fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        if !self.connected.load(Ordering::Acquire) {
            return Ok(Delivery::Dropped);
        }

        let text = message.to_json()?;
        match self.outbound.try_send(text) {
            Ok(()) => Ok(Delivery::Sent),
            Err(TrySendError::Full(_)) => Ok(Delivery::Dropped),
            Err(TrySendError::Closed(_)) => Err(SinkError::Closed),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for DeliveryChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_connection(
    config: SinkConfig,
    connected: Arc<AtomicBool>,
    mut outbound: mpsc::Receiver<String>,
    events: broadcast::Sender<ConnectionEvent>,
) {
    let url = config.url();

    loop {
        match timeout(config.connect_timeout(), connect_async(url.as_str())).await {
            Ok(Ok((stream, _response))) => {
                info!(url = %url, "Connected to cue sink");
                connected.store(true, Ordering::Release);
                let _ = events.send(ConnectionEvent::Connected);

                let reason = pump(stream, &mut outbound).await;

                connected.store(false, Ordering::Release);
                let discarded = discard_pending(&mut outbound);
                let _ = events.send(ConnectionEvent::Disconnected);

                if matches!(reason, Disconnect::Shutdown) {
                    debug!(url = %url, "Delivery channel handle dropped");
                    return;
                }
                info!(
                    url = %url,
                    reason = ?reason,
                    discarded,
                    "Cue sink connection closed, will retry"
                );
            }
            Ok(Err(e)) => {
                debug!(url = %url, error = %e, "Cue sink connection failed");
            }
            Err(_) => {
                debug!(url = %url, "Cue sink connection attempt timed out");
            }
        }

        sleep(config.reconnect_delay()).await;
    }
}

async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    outbound: &mut mpsc::Receiver<String>,
) -> Disconnect {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(text) => {
                    trace!(payload = %text, "Writing cue");
                    if let Err(e) = write.send(Message::Text(text)).await {
                        return Disconnect::WriteFailed(e.to_string());
                    }
                }
                None => {
                    let _ = write.close().await;
                    return Disconnect::Shutdown;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(reply))) => {
                    trace!(reply = %reply, "Cue sink reply");
                }
                Some(Ok(Message::Close(_))) | None => return Disconnect::ClosedByPeer,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Disconnect::ReadFailed(e.to_string()),
            },
        }
    }
}

/// Cues accepted for a connection that died before writing them are never replayed
fn discard_pending(outbound: &mut mpsc::Receiver<String>) -> usize {
    let mut discarded = 0;
    while let Ok(text) = outbound.try_recv() {
        warn!(payload = %text, "Discarding cue from closed connection");
        discarded += 1;
    }
    discarded
}
