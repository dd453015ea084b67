// SPDX-License-Identifier: Apache-2.0

use std::time::Instant;

use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use crate::http::{extract_request_id, RequestContext};
use crate::AppState;

/// Outermost layer: opens the request span, threads the request id through the
/// request extensions and response header, and records per-route metrics.
pub(crate) async fn request_tracing_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let request_id = extract_request_id(request.headers(), &state.request_id_seed);

    request.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    let mut response = next.run(request).instrument(span).await;

    let status = response.status().as_u16();
    state
        .metrics
        .observe_request(&route, status, started.elapsed())
        .await;
    tracing::info!(
        request_id = %request_id,
        method = %method,
        route = %route,
        status,
        latency_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    if let Ok(value) = axum::http::HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
