use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{HistoryStore, Measurement, Probe, Sample, Target};
use crate::stream::StreamPublisher;

// ─── Public types ────────────────────────────────────────────────

/// Lifecycle of a [`Sampler`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerState {
    Idle,
    Running,
    Stopped,
}

/// Drives one measurement round per interval across every target and
/// hands each finished sample to the history store and the publisher.
pub struct Sampler {
    targets: Arc<[Target]>,
    probe: Arc<dyn Probe>,
    interval: Duration,
    store: Arc<HistoryStore>,
    publisher: Arc<StreamPublisher>,
    state: watch::Sender<SamplerState>,
    rounds: AtomicU64,
}

// ─── Sampler impl ────────────────────────────────────────────────

impl Sampler {
    pub fn new(
        targets: Arc<[Target]>,
        probe: Arc<dyn Probe>,
        interval: Duration,
        store: Arc<HistoryStore>,
        publisher: Arc<StreamPublisher>,
    ) -> Self {
        let (state, _) = watch::channel(SamplerState::Idle);
        Self {
            targets,
            probe,
            interval,
            store,
            publisher,
            state,
            rounds: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SamplerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SamplerState> {
        self.state.subscribe()
    }

    /// Rounds completed and committed so far.
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `cancel` fires. A sampler runs at most once; calling
    /// this again after it started returns immediately.
    ///
    /// A round interrupted by cancellation is dropped, never committed.
    pub async fn run(&self, cancel: CancellationToken) {
        let started = self.state.send_if_modified(|state| {
            if *state == SamplerState::Idle {
                *state = SamplerState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            warn!(state = ?self.state(), "sampler already started");
            return;
        }

        info!(
            targets = self.targets.len(),
            interval_ms = self.interval.as_millis() as u64,
            "sampler running"
        );

        let mut ticker = tokio::time::interval(self.interval);
        // A slow round delays the next one instead of queueing catch-up ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut previous: Option<DateTime<Utc>> = None;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let timestamp = next_timestamp(previous, Utc::now());
            let sample = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("round abandoned on shutdown");
                    break;
                }
                sample = self.round(timestamp) => sample,
            };

            previous = Some(timestamp);
            self.commit(sample);
        }

        self.state.send_replace(SamplerState::Stopped);
        info!(rounds = self.rounds(), "sampler stopped");
    }

    /// Probe every target concurrently, all under the same timestamp.
    /// Measurements keep configuration order.
    pub async fn round(&self, timestamp: DateTime<Utc>) -> Sample {
        let measurements = join_all(self.targets.iter().map(|target| async move {
            Measurement {
                target: target.id.clone(),
                latency: self.probe.measure(target).await,
            }
        }))
        .await;

        Sample {
            timestamp,
            measurements,
        }
    }

    fn commit(&self, sample: Sample) {
        let failures = sample.failures();
        let sample = Arc::new(sample);
        self.store.append(Arc::clone(&sample));
        self.publisher.publish(&sample);
        let round = self.rounds.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(round, failures, "round committed");
    }
}

/// Round timestamps strictly increase at millisecond resolution, the
/// resolution of the wire format, even if the wall clock stalls or steps
/// backwards.
fn next_timestamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let step = min_step();
    match previous {
        Some(prev) if now < prev + step => prev + step,
        _ => now,
    }
}

fn min_step() -> chrono::Duration {
    chrono::Duration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_never_repeat_or_go_back() {
        let t0 = Utc.timestamp_opt(1_000, 0).unwrap();
        assert_eq!(next_timestamp(None, t0), t0);

        let same = next_timestamp(Some(t0), t0);
        assert_eq!(same, t0 + min_step());

        let too_close = t0 + chrono::Duration::microseconds(300);
        assert_eq!(next_timestamp(Some(t0), too_close), t0 + min_step());

        let earlier = Utc.timestamp_opt(900, 0).unwrap();
        assert!(next_timestamp(Some(t0), earlier) > t0);

        let later = Utc.timestamp_opt(1_001, 0).unwrap();
        assert_eq!(next_timestamp(Some(t0), later), later);
    }
}
