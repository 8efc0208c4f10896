use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Middleware that logs handled requests at INFO level.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    // Liveness probes would drown out everything else
    if path != "/health" {
        tracing::info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "request handled"
        );
    }

    response
}
