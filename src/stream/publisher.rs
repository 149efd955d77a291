use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::wire::{self, WireFormat};
use crate::error::ViewerError;
use crate::sampling::Sample;

/// One encoded sample, shared by every viewer.
pub type Frame = Arc<str>;

/// Frames a lagging viewer may fall behind before it starts skipping
pub const DEFAULT_BUFFER: usize = 16;

/// Frames a viewer may fall behind before it starts skipping
pub const MAX_BUFFER: usize = 4096;

// ─── Publisher ───────────────────────────────────────────────────

/// Encodes each finished sample once and fans it out to all viewers.
///
/// `publish` never waits on a viewer: every viewer task owns its own
/// broadcast receiver, so a slow or dead connection only affects itself.
pub struct StreamPublisher {
    tx: broadcast::Sender<Frame>,
    format: WireFormat,
    published: AtomicU64,
}

impl StreamPublisher {
    pub fn new(format: WireFormat, buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.clamp(1, MAX_BUFFER));
        Self {
            tx,
            format,
            published: AtomicU64::new(0),
        }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Encode and broadcast. An encoding failure drops this round from
    /// the stream only; the sampler carries on.
    pub fn publish(&self, sample: &Sample) {
        let frame = match wire::encode(sample, self.format) {
            Ok(frame) => Frame::from(frame),
            Err(e) => {
                error!(error = %e, timestamp = %sample.timestamp, "sample encoding failed, skipping publish");
                return;
            }
        };
        self.published.fetch_add(1, Ordering::Relaxed);
        // Err only means nobody is connected right now
        if let Ok(viewers) = self.tx.send(frame) {
            debug!(viewers, "frame published");
        }
    }

    /// New viewers start at the next frame; there is no backfill.
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.tx.subscribe()
    }

    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Frames encoded since startup, whether or not anyone was listening.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

// ─── Viewer seam ─────────────────────────────────────────────────

/// One connected consumer of the stream, as seen by the transport.
#[async_trait]
pub trait Viewer: Send {
    async fn send(&mut self, frame: &str) -> Result<(), ViewerError>;

    /// Best-effort close notification.
    async fn close(&mut self) {}
}

/// Why [`serve_viewer`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerExit {
    SendFailed,
    Shutdown,
    PublisherClosed,
}

/// Forward frames to one viewer, in production order, until a send
/// fails, the publisher goes away or `cancel` fires.
///
/// A viewer that lags past the channel buffer skips the missed frames
/// and continues with the oldest retained one.
pub async fn serve_viewer<V: Viewer>(
    id: Uuid,
    mut frames: broadcast::Receiver<Frame>,
    mut viewer: V,
    cancel: CancellationToken,
) -> ViewerExit {
    info!(viewer = %id, "viewer connected");

    let exit = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break ViewerExit::Shutdown,
            next = frames.recv() => next,
        };

        match next {
            Ok(frame) => {
                if let Err(e) = viewer.send(&frame).await {
                    debug!(viewer = %id, error = %e, "viewer send failed");
                    break ViewerExit::SendFailed;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(viewer = %id, skipped, "viewer lagging, frames skipped");
            }
            Err(RecvError::Closed) => break ViewerExit::PublisherClosed,
        }
    };

    viewer.close().await;
    info!(viewer = %id, reason = ?exit, "viewer disconnected");
    exit
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::sampling::{Latency, Measurement};

    fn sample(ms: u64) -> Sample {
        Sample {
            timestamp: Utc::now(),
            measurements: vec![Measurement {
                target: "a".into(),
                latency: Latency::Millis(ms),
            }],
        }
    }

    #[test]
    fn publishing_without_viewers_is_fine() {
        let publisher = StreamPublisher::new(WireFormat::Nested, 4);
        publisher.publish(&sample(1));
        assert_eq!(publisher.published(), 1);
        assert_eq!(publisher.viewer_count(), 0);
    }

    #[test]
    fn oversized_buffer_is_clamped() {
        let publisher = StreamPublisher::new(WireFormat::Nested, usize::MAX);
        let _rx = publisher.subscribe();
        publisher.publish(&sample(1));
        assert_eq!(publisher.viewer_count(), 1);
    }

    #[tokio::test]
    async fn subscribers_receive_frames_in_order() {
        let publisher = StreamPublisher::new(WireFormat::Flat, 8);
        let mut rx = publisher.subscribe();
        for ms in 1..=3 {
            publisher.publish(&sample(ms));
        }
        for ms in 1..=3 {
            let frame = rx.recv().await.unwrap();
            assert!(frame.contains(&format!("\"a_latency\":{ms}")));
        }
    }
}
