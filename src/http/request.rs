//! Request-scoped middleware shared by both servers.
//!
//! # Responsibilities
//! - Assign an `x-request-id` (UUID v4) unless the caller sent one
//! - Echo the ID on the response
//! - Open a tracing span carrying the ID, method and path
//! - Count requests per role
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer)
//! - Timeouts apply inside the span so they are logged with the ID
//! - Metrics wrap the timeout so timed-out requests are recorded

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::observability::metrics;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Wrap a router in the request ID, tracing, timeout and metrics layers.
#[allow(deprecated)]
pub fn with_request_layers(router: Router, role: &'static str, request_timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    role,
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            // Outside the timeout so 408s are counted too.
            .layer(middleware::from_fn_with_state(role, record_request))
            .layer(TimeoutLayer::new(request_timeout)),
    )
}

async fn record_request(State(role): State<&'static str>, req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let response = next.run(req).await;
    metrics::record_request(role, method.as_str(), response.status().as_u16(), start);
    response
}
