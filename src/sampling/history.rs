use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::Sample;

// ─── Configuration ───────────────────────────────────────────────

/// How many rounds are retained when nothing else is configured
pub const DEFAULT_CAPACITY: usize = 60;

/// One day of rounds at a one second interval
pub const MAX_CAPACITY: usize = 86_400;

// ─── Public types ────────────────────────────────────────────────

/// Bounded, oldest-first retention of recent samples.
///
/// The sampler is the only writer; the chart renderer and the HTTP API
/// read through `snapshot()`. Samples are shared as `Arc<Sample>` and
/// never mutated once stored, so a snapshot only clones pointers while
/// the lock is held.
pub struct HistoryStore {
    capacity: usize,
    inner: Mutex<VecDeque<Arc<Sample>>>,
    /// Current length, republished after every append
    len_tx: watch::Sender<usize>,
}

// ─── HistoryStore impl ───────────────────────────────────────────

impl HistoryStore {
    /// Capacity is clamped to `1..=MAX_CAPACITY`; configuration rejects
    /// values outside that range earlier.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        let (len_tx, _) = watch::channel(0);
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            len_tx,
        }
    }

    /// Append the newest sample, evicting the oldest one at capacity.
    pub fn append(&self, sample: Arc<Sample>) {
        let len = {
            let mut samples = self.inner.lock();
            if samples.len() == self.capacity {
                samples.pop_front();
            }
            samples.push_back(sample);
            samples.len()
        };
        self.len_tx.send_replace(len);
    }

    /// Point-in-time copy, oldest first. The lock is released before
    /// this returns.
    pub fn snapshot(&self) -> Vec<Arc<Sample>> {
        self.inner.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Arc<Sample>> {
        self.inner.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Readiness signal: the receiver observes the store length after
    /// every append, so consumers can wait for "enough data" instead of
    /// polling.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
