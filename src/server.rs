use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::stream::socket;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Live viewer streams ─────────────────────────────────
        .route("/ws", get(socket::viewer_socket))
        .route("/api/stream", get(socket::sample_stream))
        // ── Retained data ───────────────────────────────────────
        .route("/api/history", get(handlers::history::get_history))
        .route("/api/stats", get(handlers::history::get_stats))
        .route("/api/chart", get(handlers::history::get_chart))
        // ── Sampler ─────────────────────────────────────────────
        .route("/api/status", get(handlers::status::get_status))
        .route("/api/targets", get(handlers::status::get_targets))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
