//! Tick-driven evaluation of scene presence
//!
//! The dispatcher owns the source registry and the presence tracker. Samples
//! are ingested as they arrive; on every tick all scenes with at least one
//! source are evaluated once and transitions are handed to the [`CueSink`].

use crate::domain::config::TriggerConfig;
use crate::domain::cue::{Cue, CueSink, Delivery};
use crate::domain::presence::{ScenePresenceTracker, Transition};
use crate::domain::registry::SourceRegistry;
use crate::domain::sample::{Sample, SceneName};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub scenes_evaluated: usize,
    /// Cues produced by transitions, in scene order
    pub cues: Vec<Cue>,
    pub sent: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl TickReport {
    /// Nothing transitioned
    pub fn is_idle(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn cue_names(&self) -> Vec<&str> {
        self.cues.iter().map(Cue::name).collect()
    }
}

/// Volume-to-presence debouncer and cue dispatcher
pub struct Dispatcher<S> {
    registry: SourceRegistry,
    tracker: ScenePresenceTracker,
    sink: S,
    settings: TriggerConfig,
}

impl<S: CueSink> Dispatcher<S> {
    /// Create a dispatcher with empty state
    pub fn new(settings: TriggerConfig, sink: S) -> Self {
        let tracker = ScenePresenceTracker::new(settings.quiet_time_ms, settings.tick_period_ms);
        Self::with_state(settings, SourceRegistry::new(), tracker, sink)
    }

    /// Create a dispatcher around existing state
    pub fn with_state(
        settings: TriggerConfig,
        registry: SourceRegistry,
        tracker: ScenePresenceTracker,
        sink: S,
    ) -> Self {
        Self {
            registry,
            tracker,
            sink,
            settings,
        }
    }

    /// Record a sample and make its scene known
    pub fn ingest(&mut self, sample: Sample) {
        self.ingest_at(sample, Instant::now());
    }

    pub fn ingest_at(&mut self, sample: Sample, at: Instant) {
        self.tracker.register(&sample.scene);
        self.registry.update_at(sample, at);
    }

    pub fn tick(&mut self) -> TickReport {
        self.tick_at(Instant::now())
    }

    /// Evaluate every scene that has at least one source
    ///
    /// A scene is loud when any of its fresh samples exceeds its own limit.
    pub fn tick_at(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        if self.registry.is_empty() {
            return report;
        }

        let timeout = self.settings.source_timeout();
        let mut loudness: BTreeMap<SceneName, bool> = BTreeMap::new();
        for entry in self.registry.entries() {
            let loud = entry.is_fresh(now, timeout) && entry.sample.exceeds_limit();
            *loudness.entry(entry.sample.scene.clone()).or_insert(false) |= loud;
        }

        for (scene, loud) in loudness {
            report.scenes_evaluated += 1;

            let transition = if loud {
                self.tracker.observe_loud(&scene)
            } else {
                self.tracker.observe_quiet(&scene)
            };

            if let Some(transition) = transition {
                let cue = self.cue_for(scene, transition);
                self.deliver(&cue, &mut report);
                report.cues.push(cue);
            }
        }

        trace!(
            scenes = report.scenes_evaluated,
            cues = report.cues.len(),
            "Tick evaluated"
        );
        report
    }

    fn cue_for(&self, scene: SceneName, transition: Transition) -> Cue {
        let suffix = match transition {
            Transition::Activated => &self.settings.active_suffix,
            Transition::Deactivated => &self.settings.inactive_suffix,
        };
        Cue::new(scene, transition.presence(), suffix)
    }

    fn deliver(&self, cue: &Cue, report: &mut TickReport) {
        match self.sink.send(&cue.to_message()) {
            Ok(Delivery::Sent) => {
                report.sent += 1;
                info!(cue = cue.name(), "Cue sent");
            }
            Ok(Delivery::Dropped) => {
                report.dropped += 1;
                warn!(cue = cue.name(), "Sink disconnected, cue dropped");
            }
            Err(e) => {
                report.failed += 1;
                warn!(cue = cue.name(), error = %e, "Failed to send cue");
            }
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ScenePresenceTracker {
        &self.tracker
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn settings(&self) -> &TriggerConfig {
        &self.settings
    }
}

impl<S> Drop for Dispatcher<S> {
    fn drop(&mut self) {
        debug!(
            sources = self.registry.len(),
            scenes = self.tracker.len(),
            "Dispatcher dropped"
        );
    }
}
