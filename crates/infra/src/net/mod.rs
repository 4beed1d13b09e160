//! Network transports and the relay control loop
//!
//! - `listener`: WebSocket endpoint receiving volume samples (axum)
//! - `delivery`: reconnecting WebSocket client to the cue-automation service
//! - `engine`: single task interleaving sample ingestion with the tick

pub mod delivery;
pub mod engine;
pub mod listener;

pub use delivery::{ConnectionEvent, DeliveryChannel};
pub use engine::RelayEngine;
pub use listener::{parse_frame, ListenerError, SampleListener};
