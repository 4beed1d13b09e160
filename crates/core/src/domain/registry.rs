//! Latest-sample-wins store of source readings

use crate::domain::sample::{Sample, SourceId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Registry entry: the last sample of a source and when it arrived
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub sample: Sample,
    pub updated_at: Instant,
}

impl SourceEntry {
    /// Whether the entry was refreshed within `timeout` of `now`
    pub fn is_fresh(&self, now: Instant, timeout: Option<Duration>) -> bool {
        match timeout {
            None => true,
            Some(timeout) => now.saturating_duration_since(self.updated_at) <= timeout,
        }
    }
}

/// Holds the most recent sample of every source that ever reported
///
/// No history is kept and nothing is evicted implicitly.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: HashMap<SourceId, SourceEntry>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Replace any prior sample for the same source
    pub fn update(&mut self, sample: Sample) {
        self.update_at(sample, Instant::now());
    }

    /// Replace any prior sample for the same source, stamped with `at`
    pub fn update_at(&mut self, sample: Sample, at: Instant) {
        trace!(
            source = %sample.source_id,
            scene = %sample.scene,
            volume = sample.volume,
            limit = sample.limit,
            "Sample updated"
        );
        self.entries.insert(
            sample.source_id.clone(),
            SourceEntry {
                sample,
                updated_at: at,
            },
        );
    }

    /// Current sample of a source
    pub fn get(&self, id: &SourceId) -> Option<&Sample> {
        self.entries.get(id).map(|entry| &entry.sample)
    }

    /// Forget a source entirely
    pub fn remove(&mut self, id: &SourceId) -> Option<Sample> {
        self.entries.remove(id).map(|entry| entry.sample)
    }

    /// Iterate over the current samples
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.entries.values().map(|entry| &entry.sample)
    }

    /// Iterate over the current entries with their timestamps
    pub fn entries(&self) -> impl Iterator<Item = &SourceEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
