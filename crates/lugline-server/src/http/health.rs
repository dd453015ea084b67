// SPDX-License-Identifier: Apache-2.0

//! Liveness and metrics endpoints. Both sit outside the authenticated groups.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::telemetry::render_metrics;
use crate::AppState;

pub(crate) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": "Lugline API is running",
        "status": "healthy",
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    }))
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    render_metrics(
        &state.metrics,
        &state.jobs,
        state.hub.connection_count(),
        state.started_at.elapsed(),
    )
    .await
}
