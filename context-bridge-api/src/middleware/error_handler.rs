use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Log failed requests with method, path, status and latency
pub async fn handle_errors(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = req.uri().path().to_string();
    let method = req.method().to_string();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        error!(%method, %path, %status, ?elapsed, "Server error");
    } else if status.is_client_error() && status != StatusCode::NOT_FOUND {
        warn!(%method, %path, %status, ?elapsed, "Client error");
    } else if status == StatusCode::SWITCHING_PROTOCOLS {
        debug!(%method, %path, "Upgraded to WebSocket");
    }

    response
}
