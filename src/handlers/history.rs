use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppError;
use crate::chart::ChartData;
use crate::sampling::stats::{self, TargetStats};
use crate::sampling::Sample;
use crate::AppState;

// ─── GET /api/history ────────────────────────────────────────────
/// Every retained round, oldest first, in the nested frame shape.

pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<Vec<Arc<Sample>>> {
    Json(state.store.snapshot())
}

// ─── GET /api/stats ──────────────────────────────────────────────
/// Per-target percentiles and loss over the retention window.

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<Vec<TargetStats>> {
    let snapshot = state.store.snapshot();
    Json(stats::summarize(&state.targets, &snapshot))
}

// ─── GET /api/chart ──────────────────────────────────────────────
/// Chart series and labels for a browser-side renderer. Failed probes
/// are `null` points.

pub async fn get_chart(State(state): State<Arc<AppState>>) -> Result<Json<ChartData>, AppError> {
    let snapshot = state.store.snapshot();
    ChartData::from_snapshot(&state.targets, &snapshot)
        .map(Json)
        .ok_or(AppError::NoData {
            retained: snapshot.len(),
            retry_after: state.sampler.interval(),
        })
}
