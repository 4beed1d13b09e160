//! Relay engine: the single control loop of the service
//!
//! The engine owns the [`Dispatcher`] outright. Samples arrive over a channel
//! and are ingested between ticks, so ticks never overlap and no state is
//! shared across tasks.

use audiotrigger_core::domain::cue::CueSink;
use audiotrigger_core::domain::dispatcher::Dispatcher;
use audiotrigger_core::domain::sample::Sample;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Drives a dispatcher from a sample channel and a fixed-period timer
pub struct RelayEngine<S> {
    dispatcher: Dispatcher<S>,
    samples: mpsc::Receiver<Sample>,
}

impl<S: CueSink> RelayEngine<S> {
    pub fn new(dispatcher: Dispatcher<S>, samples: mpsc::Receiver<Sample>) -> Self {
        Self {
            dispatcher,
            samples,
        }
    }

    /// Run until `shutdown` resolves, then hand the dispatcher back
    pub async fn run<F>(mut self, shutdown: F) -> Dispatcher<S>
    where
        F: Future<Output = ()>,
    {
        let period = self.dispatcher.settings().tick_period();
        let mut ticker = interval(period);
        // A slow tick delays the next one instead of bursting to catch up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            tick_ms = period.as_millis() as u64,
            quiet_time_ms = self.dispatcher.settings().quiet_time_ms,
            "Relay engine started"
        );

        tokio::pin!(shutdown);
        let mut inbound_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                sample = self.samples.recv(), if inbound_open => match sample {
                    Some(sample) => self.dispatcher.ingest(sample),
                    None => {
                        debug!("Sample channel closed, ticking on existing state");
                        inbound_open = false;
                    }
                },
                _ = ticker.tick() => {
                    let report = self.dispatcher.tick();
                    if !report.is_idle() {
                        debug!(
                            cues = ?report.cue_names(),
                            sent = report.sent,
                            dropped = report.dropped,
                            failed = report.failed,
                            "Tick produced cues"
                        );
                    }
                }
            }
        }

        info!(
            sources = self.dispatcher.registry().len(),
            "Relay engine stopped"
        );
        self.dispatcher
    }
}
