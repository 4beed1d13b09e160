//! Per-scene presence state machine with quiet-time hysteresis
//!
//! A scene starts `Inactive`. One loud observation flips it to `Active`;
//! getting back to `Inactive` requires the scene to read quiet for strictly
//! longer than the configured quiet time, measured in whole tick periods.

use crate::domain::sample::SceneName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// Presence of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Active,
    #[default]
    Inactive,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Active => write!(f, "active"),
            Presence::Inactive => write!(f, "inactive"),
        }
    }
}

/// State change produced by an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated,
}

impl Transition {
    /// Presence after the transition
    pub fn presence(self) -> Presence {
        match self {
            Transition::Activated => Presence::Active,
            Transition::Deactivated => Presence::Inactive,
        }
    }
}

/// Presence and quiet accumulator of one scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneState {
    pub presence: Presence,
    /// Milliseconds the scene has read quiet while active
    pub quiet_ms: u64,
}

/// Tracks presence for every scene seen so far
#[derive(Debug, Clone)]
pub struct ScenePresenceTracker {
    scenes: HashMap<SceneName, SceneState>,
    quiet_time_ms: u64,
    tick_period_ms: u64,
}

impl ScenePresenceTracker {
    pub fn new(quiet_time_ms: u64, tick_period_ms: u64) -> Self {
        Self {
            scenes: HashMap::new(),
            quiet_time_ms,
            tick_period_ms,
        }
    }

    pub fn quiet_time_ms(&self) -> u64 {
        self.quiet_time_ms
    }

    pub fn tick_period_ms(&self) -> u64 {
        self.tick_period_ms
    }

    /// Make a scene known as `Inactive` without emitting anything
    ///
    /// Returns `true` if the scene was not known before.
    pub fn register(&mut self, scene: &SceneName) -> bool {
        if self.scenes.contains_key(scene) {
            return false;
        }
        debug!(scene = %scene, "Scene registered as inactive");
        self.scenes.insert(scene.clone(), SceneState::default());
        true
    }

    /// A scene read above its threshold this tick
    pub fn observe_loud(&mut self, scene: &SceneName) -> Option<Transition> {
        if self.register(scene) {
            return None;
        }
        let state = self.scenes.get_mut(scene)?;

        match state.presence {
            Presence::Inactive => {
                state.presence = Presence::Active;
                state.quiet_ms = 0;
                debug!(scene = %scene, "Scene activated");
                Some(Transition::Activated)
            }
            Presence::Active => {
                state.quiet_ms = 0;
                None
            }
        }
    }

    /// A scene read at or below its threshold this tick
    pub fn observe_quiet(&mut self, scene: &SceneName) -> Option<Transition> {
        if self.register(scene) {
            return None;
        }
        let state = self.scenes.get_mut(scene)?;

        if state.presence == Presence::Inactive {
            return None;
        }

        state.quiet_ms = state.quiet_ms.saturating_add(self.tick_period_ms);
        trace!(scene = %scene, quiet_ms = state.quiet_ms, "Scene quiet");

        if state.quiet_ms > self.quiet_time_ms {
            state.presence = Presence::Inactive;
            state.quiet_ms = 0;
            debug!(scene = %scene, "Scene deactivated");
            Some(Transition::Deactivated)
        } else {
            None
        }
    }

    /// Current presence, `None` for scenes never seen
    pub fn presence(&self, scene: &SceneName) -> Option<Presence> {
        self.scenes.get(scene).map(|state| state.presence)
    }

    pub fn state(&self, scene: &SceneName) -> Option<SceneState> {
        self.scenes.get(scene).copied()
    }

    /// All known scenes with their state
    pub fn scenes(&self) -> impl Iterator<Item = (&SceneName, &SceneState)> {
        self.scenes.iter()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
