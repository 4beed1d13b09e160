//! Outbound cues and the sink abstraction they are delivered through
//!
//! The sink is implemented in the `infra` crate (a reconnecting WebSocket
//! client); the dispatcher only sees this trait.

use crate::domain::presence::Presence;
use crate::domain::sample::SceneName;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while handing a cue to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Delivery channel closed")]
    Closed,

    #[error("Delivery failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, SinkError>;

/// What happened to a cue handed to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to a live connection
    Sent,
    /// No live connection, the cue is gone
    Dropped,
}

/// A scene presence change, named for the automation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub scene: SceneName,
    pub presence: Presence,
    name: String,
}

impl Cue {
    /// Build `<scene>_<suffix>`
    pub fn new(scene: SceneName, presence: Presence, suffix: &str) -> Self {
        let name = format!("{}_{}", scene.as_str(), suffix);
        Self {
            scene,
            presence,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_message(&self) -> OutboundMessage {
        OutboundMessage {
            cue: self.name.clone(),
        }
    }
}

/// Wire envelope understood by the automation service: `{"cue": "<name>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub cue: String,
}

impl OutboundMessage {
    pub fn new(cue: impl Into<String>) -> Self {
        Self { cue: cue.into() }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Best-effort, at-most-once destination for cues
///
/// `send` must never block: a sink without a live connection reports
/// [`Delivery::Dropped`] and forgets the message.
pub trait CueSink: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> Result<Delivery>;

    fn is_connected(&self) -> bool;
}

impl<T: CueSink + ?Sized> CueSink for Arc<T> {
    fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        (**self).send(message)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
