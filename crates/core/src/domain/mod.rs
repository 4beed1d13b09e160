//! Domain entities and business rules

pub mod config;
pub mod cue;
pub mod dispatcher;
pub mod presence;
pub mod registry;
pub mod sample;

// Re-export specific items to avoid ambiguous glob imports
pub use config::{
    ConfigError, ConfigManager, ListenerConfig, RelayConfig, SinkConfig, TriggerConfig,
};
pub use cue::{Cue, CueSink, Delivery, OutboundMessage, SinkError};
pub use dispatcher::{Dispatcher, TickReport};
pub use presence::{Presence, ScenePresenceTracker, SceneState, Transition};
pub use registry::SourceRegistry;
pub use sample::{RawSample, Sample, SampleError, SceneName, SourceId};
