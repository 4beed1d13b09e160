//! Inbound sample endpoint
//!
//! Audio sources push `{volume, id, scene, limit}` JSON text frames over a
//! WebSocket at `/audio`. Each valid frame is coerced into a [`Sample`] and
//! forwarded to the relay engine; invalid frames are logged and skipped
//! without closing the connection.

use audiotrigger_core::domain::config::ListenerConfig;
use audiotrigger_core::domain::sample::{RawSample, Sample, SampleError};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Event name used by the browser meter pages
pub const AUDIO_INPUT_EVENT: &str = "audioInput";

/// Errors that can occur while starting the listener
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ListenerError>;

/// Inbound frame, either the bare sample or a named event envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InboundFrame {
    Envelope { event: String, data: RawSample },
    Bare(RawSample),
}

/// Parse one text frame; `Ok(None)` for events other than audio input
pub fn parse_frame(text: &str) -> std::result::Result<Option<Sample>, SampleError> {
    match serde_json::from_str::<InboundFrame>(text)? {
        InboundFrame::Envelope { event, data } if event == AUDIO_INPUT_EVENT => {
            Sample::try_from(data).map(Some)
        }
        InboundFrame::Envelope { event, .. } => {
            debug!(event = %event, "Ignoring unrelated event");
            Ok(None)
        }
        InboundFrame::Bare(raw) => Sample::try_from(raw).map(Some),
    }
}

#[derive(Clone)]
struct ListenerState {
    samples: mpsc::Sender<Sample>,
}

/// Running WebSocket server accepting sample pushes
pub struct SampleListener {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl SampleListener {
    /// Bind the configured address and start serving
    pub async fn bind(config: &ListenerConfig, samples: mpsc::Sender<Sample>) -> Result<Self> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let app = router(ListenerState { samples });

        info!(address = %local_addr, "Sample listener running");

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                error!(error = %e, "Sample listener failed");
            }
        });

        Ok(Self { local_addr, task })
    }

    /// Actual bound address (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections
    pub fn shutdown(&self) {
        info!(address = %self.local_addr, "Stopping sample listener");
        self.task.abort();
    }
}

impl Drop for SampleListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn router(state: ListenerState) -> Router {
    Router::new()
        .route("/audio", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ws_handler(
    State(state): State<ListenerState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: ListenerState, mut socket: WebSocket) {
    debug!("Sample producer connected");

    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => match parse_frame(&text) {
                Ok(Some(sample)) => {
                    if state.samples.send(sample).await.is_err() {
                        debug!("Relay engine gone, closing producer connection");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, payload = %text, "Rejected malformed sample");
                }
            },
            Message::Binary(data) => {
                warn!(bytes = data.len(), "Unexpected binary frame received");
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    debug!("Sample producer disconnected");
}
