use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, warn};

const RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time-us");
const SERVER_TIMING: HeaderName = HeaderName::from_static("server-timing");

/// Viewer routes stay open for the whole session; their handler time is
/// only the upgrade, so they are not logged.
const STREAM_ROUTES: [&str; 2] = ["/ws", "/api/stream"];

/// Stamps every response with `X-Response-Time-Us` and `Server-Timing`
/// and logs read API calls at debug level.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros() as u64;

    let headers = response.headers_mut();
    headers.insert(RESPONSE_TIME, HeaderValue::from(us));
    if let Ok(val) = HeaderValue::from_str(&format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0)) {
        headers.insert(SERVER_TIMING, val);
    }

    if STREAM_ROUTES.contains(&path.as_str()) {
        return response;
    }

    let status = response.status();
    if status.is_server_error() {
        warn!(status = status.as_u16(), %method, path = %path, us, "request failed");
    } else {
        debug!(status = status.as_u16(), %method, path = %path, us, "request served");
    }

    response
}
