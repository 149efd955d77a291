pub mod terminal;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::RenderError;
use crate::sampling::{HistoryStore, Sample, Target};

pub use terminal::TerminalRasterizer;

/// Fewer samples than this cannot show a trend
pub const MIN_POINTS: usize = 2;

/// Smallest Y upper bound, so a flat line near 0 ms stays readable
const MIN_Y_MAX: f64 = 10.0;

const TIME_FORMAT: &str = "%H:%M:%S";

// ─── Chart data ──────────────────────────────────────────────────

/// One sample's value for one target. `latency_ms` is `None` for a
/// failed probe and is drawn as a gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub target: String,
    pub label: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Contiguous runs of successful points as `(x, y)` pairs, where x is
    /// milliseconds since the epoch. Failures split runs.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for point in &self.points {
            match point.latency_ms {
                Some(ms) => current.push((x_value(point.timestamp), ms)),
                None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    pub fn plotted_points(&self) -> usize {
        self.points.iter().filter(|p| p.latency_ms.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartAxis {
    pub title: String,
    pub bounds: [f64; 2],
    pub labels: Vec<String>,
}

/// Everything a rasterizer needs: series plus axis and legend labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub x_axis: ChartAxis,
    pub y_axis: ChartAxis,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    /// Build chart data from a snapshot, or `None` below [`MIN_POINTS`].
    /// Every series gets exactly one point per sample.
    pub fn from_snapshot(targets: &[Target], snapshot: &[Arc<Sample>]) -> Option<Self> {
        let (first, last) = match (snapshot.first(), snapshot.last()) {
            (Some(first), Some(last)) if snapshot.len() >= MIN_POINTS => (first, last),
            _ => return None,
        };

        let series: Vec<ChartSeries> = targets
            .iter()
            .map(|target| ChartSeries {
                target: target.id.clone(),
                label: target.label(),
                points: snapshot
                    .iter()
                    .map(|sample| ChartPoint {
                        timestamp: sample.timestamp,
                        latency_ms: sample
                            .latency_of(&target.id)
                            .and_then(|l| l.as_millis())
                            .map(|ms| ms as f64),
                    })
                    .collect(),
            })
            .collect();

        let peak = series
            .iter()
            .flat_map(|s| s.points.iter().filter_map(|p| p.latency_ms))
            .fold(0.0_f64, f64::max);
        // 10 % headroom above the peak
        let y_max = (peak * 11.0 / 10.0).ceil().max(MIN_Y_MAX);

        let mid = &snapshot[snapshot.len() / 2];
        let x_axis = ChartAxis {
            title: "time (UTC)".into(),
            bounds: [x_value(first.timestamp), x_value(last.timestamp)],
            labels: [first, mid, last]
                .iter()
                .map(|s| s.timestamp.format(TIME_FORMAT).to_string())
                .collect(),
        };
        let y_axis = ChartAxis {
            title: "latency".into(),
            bounds: [0.0, y_max],
            labels: [0.0, y_max / 2.0, y_max]
                .iter()
                .map(|v| format!("{v:.0} ms"))
                .collect(),
        };

        Some(Self {
            title: "Round-trip latency".into(),
            x_axis,
            y_axis,
            series,
        })
    }
}

fn x_value(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_millis() as f64
}

// ─── Rendering ───────────────────────────────────────────────────

/// Turns chart data into an image. The renderer supplies data and
/// labels; pixel (or cell) drawing lives behind this trait.
pub trait Rasterizer: Send + Sync {
    type Image;

    fn rasterize(&self, chart: &ChartData) -> Result<Self::Image, RenderError>;
}

/// Result of one render. `NoData` means "show a placeholder".
#[derive(Debug)]
pub enum Rendered<I> {
    Chart { data: ChartData, image: I },
    NoData,
}

impl<I> Rendered<I> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    pub fn image(&self) -> Option<&I> {
        match self {
            Self::Chart { image, .. } => Some(image),
            Self::NoData => None,
        }
    }

    pub fn data(&self) -> Option<&ChartData> {
        match self {
            Self::Chart { data, .. } => Some(data),
            Self::NoData => None,
        }
    }
}

/// Snapshots the history store and rasterizes it on demand.
/// Read-only with respect to the store.
pub struct ChartRenderer<R> {
    store: Arc<HistoryStore>,
    targets: Arc<[Target]>,
    rasterizer: R,
}

impl<R: Rasterizer> ChartRenderer<R> {
    pub fn new(store: Arc<HistoryStore>, targets: Arc<[Target]>, rasterizer: R) -> Self {
        Self {
            store,
            targets,
            rasterizer,
        }
    }

    /// Rasterizer errors are logged and reported as `NoData`.
    pub fn render(&self) -> Rendered<R::Image> {
        let snapshot = self.store.snapshot();
        let Some(data) = ChartData::from_snapshot(&self.targets, &snapshot) else {
            return Rendered::NoData;
        };

        match self.rasterizer.rasterize(&data) {
            Ok(image) => Rendered::Chart { data, image },
            Err(e) => {
                warn!(error = %e, samples = snapshot.len(), "chart rendering failed");
                Rendered::NoData
            }
        }
    }
}
