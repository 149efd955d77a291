#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use latency_blip::sampling::{HistoryStore, Latency, Probe, Sampler, Target};
use latency_blip::stream::{StreamPublisher, WireFormat};

/// Returns a fixed latency per target id after an optional delay, and
/// remembers when each call started.
pub struct FixedProbe {
    results: HashMap<String, Latency>,
    delays: Mutex<Vec<Duration>>,
    pub starts: Mutex<Vec<Instant>>,
}

impl FixedProbe {
    pub fn new(results: &[(&str, Latency)]) -> Self {
        Self {
            results: results
                .iter()
                .map(|(id, latency)| (id.to_string(), *latency))
                .collect(),
            delays: Mutex::new(Vec::new()),
            starts: Mutex::new(Vec::new()),
        }
    }

    /// Delays consumed one per call, in order; afterwards calls are instant.
    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.delays.lock() = delays.into_iter().rev().collect();
        self
    }
}

#[async_trait]
impl Probe for FixedProbe {
    async fn measure(&self, target: &Target) -> Latency {
        self.starts.lock().push(Instant::now());
        let delay = self.delays.lock().pop();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.results
            .get(&target.id)
            .copied()
            .unwrap_or(Latency::Failed)
    }
}

pub struct Harness {
    pub targets: Arc<[Target]>,
    pub store: Arc<HistoryStore>,
    pub publisher: Arc<StreamPublisher>,
    pub sampler: Arc<Sampler>,
}

pub fn harness(
    targets: Vec<Target>,
    probe: Arc<dyn Probe>,
    interval: Duration,
    capacity: usize,
) -> Harness {
    let targets: Arc<[Target]> = targets.into();
    let store = Arc::new(HistoryStore::new(capacity));
    let publisher = Arc::new(StreamPublisher::new(WireFormat::Nested, 16));
    let sampler = Arc::new(Sampler::new(
        targets.clone(),
        probe,
        interval,
        store.clone(),
        publisher.clone(),
    ));
    Harness {
        targets,
        store,
        publisher,
        sampler,
    }
}

pub fn two_targets() -> Vec<Target> {
    vec![
        Target::new("A", "http://a.invalid"),
        Target::new("B", "http://b.invalid"),
    ]
}
