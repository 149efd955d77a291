pub mod history;
pub mod probe;
pub mod sampler;
pub mod stats;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use history::HistoryStore;
pub use probe::{HttpProbe, Probe, SimulatedProbe};
pub use sampler::{Sampler, SamplerState};

/// One remote endpoint. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Display name, also the key in the wire format
    pub id: String,
    /// Address probed with a GET
    pub url: String,
}

impl Target {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Legend label used by the chart: `id (url)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.id, self.url)
    }
}

/// Outcome of probing one target in one round.
///
/// A failure is its own case. It is never folded into a number, so no
/// consumer can mistake it for a measured duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    Millis(u64),
    Failed,
}

impl Latency {
    /// Whole milliseconds, rounding down (sub-millisecond → 0).
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self::Millis(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn as_millis(self) -> Option<u64> {
        match self {
            Self::Millis(ms) => Some(ms),
            Self::Failed => None,
        }
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// A single target's slot inside a [`Sample`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub target: String,
    pub latency: Latency,
}

/// One round across all targets, stamped once.
/// Measurements are in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub measurements: Vec<Measurement>,
}

impl Sample {
    /// Latency recorded for `target`, if that target is part of the sample.
    pub fn latency_of(&self, target: &str) -> Option<Latency> {
        self.measurements
            .iter()
            .find(|m| m.target == target)
            .map(|m| m.latency)
    }

    pub fn failures(&self) -> usize {
        self.measurements
            .iter()
            .filter(|m| m.latency.is_failed())
            .count()
    }
}
