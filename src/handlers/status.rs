use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::sampling::{SamplerState, Target};
use crate::stream::WireFormat;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub sampler: SamplerState,
    pub rounds: u64,
    pub interval_ms: u64,
    pub history_len: usize,
    pub history_capacity: usize,
    /// Timestamp of the newest retained round
    pub last_round: Option<DateTime<Utc>>,
    pub viewers: usize,
    pub frames_published: u64,
    pub wire_format: WireFormat,
}

// ─── GET /api/status ─────────────────────────────────────────────

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        sampler: state.sampler.state(),
        rounds: state.sampler.rounds(),
        interval_ms: state.sampler.interval().as_millis() as u64,
        history_len: state.store.len(),
        history_capacity: state.store.capacity(),
        last_round: state.store.latest().map(|s| s.timestamp),
        viewers: state.publisher.viewer_count(),
        frames_published: state.publisher.published(),
        wire_format: state.publisher.format(),
    })
}

// ─── GET /api/targets ────────────────────────────────────────────

pub async fn get_targets(State(state): State<Arc<AppState>>) -> Json<Vec<Target>> {
    Json(state.targets.to_vec())
}
