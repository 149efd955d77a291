//! Periodic round-trip latency sampling with bounded history, a live
//! viewer stream and chart rendering.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub mod chart;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod sampling;
pub mod server;
pub mod stream;

use sampling::{HistoryStore, Sampler, Target};
use stream::StreamPublisher;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Configured targets, in configuration order.
    pub targets: Arc<[Target]>,

    /// Retained rounds. The sampler appends, handlers snapshot.
    pub store: Arc<HistoryStore>,

    /// Fan-out of encoded rounds to connected viewers.
    pub publisher: Arc<StreamPublisher>,

    /// Read-only view of the sampler for status reporting.
    pub sampler: Arc<Sampler>,

    /// Root shutdown signal; viewer tasks hold child tokens.
    pub shutdown: CancellationToken,
}
