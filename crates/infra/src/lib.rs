//! AudioTrigger infrastructure
//!
//! Network adapters around the core dispatcher: the inbound sample listener,
//! the reconnecting cue delivery channel and the relay engine loop.

pub mod net;
