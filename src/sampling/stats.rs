use std::sync::Arc;

use hdrhistogram::Histogram;
use serde::Serialize;

use super::{Latency, Sample, Target};

// 1 ms → 60 s at 3 significant figures; probes time out long before the top
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Shape of the successful round-trip times of one target, in ms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyProfile {
    pub min_ms: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
    /// Standard deviation around the mean
    pub jitter_ms: f64,
}

/// One target over the retention window.
#[derive(Debug, Clone, Serialize)]
pub struct TargetStats {
    pub target: String,
    pub url: String,
    /// Rounds that measured this target
    pub samples: u64,
    pub failures: u64,
    /// Share of failed rounds, 0–100
    pub loss_pct: f64,
    /// Latest round, `None` if it failed or nothing was measured yet
    pub last_ms: Option<u64>,
    /// `None` until at least one round succeeds
    pub latency: Option<LatencyProfile>,
}

/// Per-target summary of a snapshot, in configuration order. Failed
/// rounds count toward `failures` and `loss_pct` but never toward the
/// latency profile.
pub fn summarize(targets: &[Target], snapshot: &[Arc<Sample>]) -> Vec<TargetStats> {
    targets
        .iter()
        .map(|target| {
            let mut tally = Tally::new();
            for latency in snapshot.iter().filter_map(|s| s.latency_of(&target.id)) {
                tally.record(latency);
            }
            tally.finish(target)
        })
        .collect()
}

// ─── Tally ───────────────────────────────────────────────────────

struct Tally {
    /// `None` only if the bounds above were rejected
    hist: Option<Histogram<u64>>,
    samples: u64,
    failures: u64,
    last: Option<Latency>,
}

impl Tally {
    fn new() -> Self {
        Self {
            hist: Histogram::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG).ok(),
            samples: 0,
            failures: 0,
            last: None,
        }
    }

    fn record(&mut self, latency: Latency) {
        self.samples += 1;
        self.last = Some(latency);
        match latency {
            Latency::Millis(ms) => {
                if let Some(hist) = self.hist.as_mut() {
                    hist.saturating_record(ms);
                }
            }
            Latency::Failed => self.failures += 1,
        }
    }

    fn finish(self, target: &Target) -> TargetStats {
        let loss_pct = match self.samples {
            0 => 0.0,
            n => self.failures as f64 * 100.0 / n as f64,
        };
        let latency = self.hist.filter(|h| h.len() > 0).map(|h| LatencyProfile {
            min_ms: h.min(),
            p50_ms: h.value_at_quantile(0.50),
            p95_ms: h.value_at_quantile(0.95),
            p99_ms: h.value_at_quantile(0.99),
            max_ms: h.max(),
            mean_ms: h.mean(),
            jitter_ms: h.stdev(),
        });

        TargetStats {
            target: target.id.clone(),
            url: target.url.clone(),
            samples: self.samples,
            failures: self.failures,
            loss_pct,
            last_ms: self.last.and_then(|l| l.as_millis()),
            latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::sampling::Measurement;

    fn round(a: Latency, b: Latency) -> Arc<Sample> {
        Arc::new(Sample {
            timestamp: Utc::now(),
            measurements: vec![
                Measurement {
                    target: "a".into(),
                    latency: a,
                },
                Measurement {
                    target: "b".into(),
                    latency: b,
                },
            ],
        })
    }

    fn targets() -> Vec<Target> {
        vec![Target::new("a", "http://a"), Target::new("b", "http://b")]
    }

    #[test]
    fn failures_count_as_loss_not_latency() {
        let snapshot = vec![
            round(Latency::Millis(10), Latency::Failed),
            round(Latency::Millis(20), Latency::Failed),
            round(Latency::Millis(30), Latency::Millis(5)),
            round(Latency::Millis(40), Latency::Failed),
        ];

        let stats = summarize(&targets(), &snapshot);
        let a = &stats[0];
        assert_eq!((a.samples, a.failures), (4, 0));
        assert_eq!(a.last_ms, Some(40));
        let profile = a.latency.as_ref().unwrap();
        assert_eq!((profile.min_ms, profile.max_ms), (10, 40));
        assert!((profile.mean_ms - 25.0).abs() < 0.01);
        // Population standard deviation of 10, 20, 30, 40
        assert!((profile.jitter_ms - 11.18).abs() < 0.01);

        let b = &stats[1];
        assert_eq!(b.failures, 3);
        assert!((b.loss_pct - 75.0).abs() < f64::EPSILON);
        assert_eq!(b.last_ms, None);
        let profile = b.latency.as_ref().unwrap();
        assert_eq!((profile.min_ms, profile.max_ms, profile.p99_ms), (5, 5, 5));
        assert_eq!(profile.jitter_ms, 0.0);
    }

    #[test]
    fn all_failed_target_has_no_profile() {
        let snapshot = vec![
            round(Latency::Millis(1), Latency::Failed),
            round(Latency::Millis(2), Latency::Failed),
        ];
        let stats = summarize(&targets(), &snapshot);
        assert_eq!(stats[1].latency, None);
        assert_eq!(stats[1].loss_pct, 100.0);
    }

    #[test]
    fn empty_snapshot() {
        let stats = summarize(&targets(), &[]);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].samples, 0);
        assert_eq!(stats[0].loss_pct, 0.0);
        assert_eq!(stats[0].latency, None);
        assert_eq!(stats[0].last_ms, None);
    }
}
