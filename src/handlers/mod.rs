pub mod history;
pub mod status;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not enough samples yet ({retained} retained, 2 needed)")]
    NoData {
        retained: usize,
        /// One sampling interval; a retry sooner cannot succeed.
        retry_after: Duration,
    },
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NoData { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error":  self.to_string(),
            "status": status.as_u16(),
        });

        let mut response = (status, Json(body)).into_response();
        let Self::NoData { retry_after, .. } = self;
        let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        response
    }
}
