use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::{Latency, Target};
use crate::error::ProbeError;

/// One latency measurement against one target.
///
/// Implementations absorb every transport error and report it as
/// [`Latency::Failed`]; they never retry.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn measure(&self, target: &Target) -> Latency;
}

// ─── HTTP probe ──────────────────────────────────────────────────

/// Times a GET from request start until the response headers arrive.
/// The body is dropped unread.
pub struct HttpProbe {
    client: reqwest::Client,
    fail_on_http_error: bool,
}

impl HttpProbe {
    /// `timeout` bounds the whole request, so an unreachable target can
    /// never hold a round for longer than that.
    pub fn new(timeout: Duration, fail_on_http_error: bool) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("latency-blip/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            fail_on_http_error,
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn measure(&self, target: &Target) -> Latency {
        let start = Instant::now();
        let result = self.client.get(&target.url).send().await;
        let elapsed = start.elapsed();

        match result {
            Ok(response) => {
                let status = response.status();
                drop(response);
                if self.fail_on_http_error && !status.is_success() {
                    warn!(target = %target.id, %status, "probe got non-success status");
                    return Latency::Failed;
                }
                let latency = Latency::from_elapsed(elapsed);
                debug!(target = %target.id, latency_ms = ?latency.as_millis(), "probe ok");
                latency
            }
            Err(e) => {
                warn!(target = %target.id, error = %e, "probe failed");
                Latency::Failed
            }
        }
    }
}

// ─── Simulated probe ─────────────────────────────────────────────

/// Offline stand-in for `HttpProbe`: jittered latencies around a
/// per-target baseline with an occasional failure.
///
/// Deterministic for a given seed, like the load generator workers.
pub struct SimulatedProbe {
    rng: Mutex<StdRng>,
    failure_rate: f64,
    baselines: Mutex<HashMap<String, u64>>,
}

impl SimulatedProbe {
    pub fn new(seed: u64, failure_rate: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            failure_rate: failure_rate.clamp(0.0, 1.0),
            baselines: Mutex::new(HashMap::new()),
        }
    }

    fn next_latency(&self, target: &Target) -> Latency {
        let mut rng = self.rng.lock();
        if rng.gen_bool(self.failure_rate) {
            return Latency::Failed;
        }
        let baseline = *self
            .baselines
            .lock()
            .entry(target.id.clone())
            .or_insert_with(|| rng.gen_range(8..=120u64));
        // ±25 % jitter, plus a rare spike
        let jitter = rng.gen_range(0..=baseline / 2);
        let mut ms = baseline - baseline / 4 + jitter;
        if rng.gen_bool(0.02) {
            ms *= 4;
        }
        Latency::Millis(ms)
    }
}

#[async_trait]
impl Probe for SimulatedProbe {
    async fn measure(&self, target: &Target) -> Latency {
        let latency = self.next_latency(target);
        if let Latency::Millis(ms) = latency {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        latency
    }
}
