// SPDX-License-Identifier: Apache-2.0

//! Session authentication and role guards.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use lugline_api::errors::ApiError;
use lugline_model::Role;

use crate::http::{failure_response, CurrentUser, SessionToken};
use crate::AppState;

/// Loads the session user from the `Authorization: Bearer` token and stashes it
/// in the request extensions for handlers and role guards downstream.
pub(crate) async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Some(token) => token,
        None => {
            return failure_response(&request, ApiError::unauthorized("Authentication required"))
        }
    };
    let user = match state.store.find_session_user(&token, Utc::now()).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return failure_response(
                &request,
                ApiError::unauthorized("Invalid or expired session"),
            )
        }
        Err(err) => {
            tracing::error!(error = %err, "session lookup failed");
            return failure_response(&request, ApiError::internal("Internal server error"));
        }
    };
    if !user.is_active {
        return failure_response(&request, ApiError::forbidden("Account is deactivated"));
    }
    request.extensions_mut().insert(SessionToken(token));
    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

pub(crate) async fn require_driver(request: Request<Body>, next: Next) -> Response {
    require_role(request, next, Role::Driver).await
}

pub(crate) async fn require_admin(request: Request<Body>, next: Next) -> Response {
    require_role(request, next, Role::Admin).await
}

async fn require_role(request: Request<Body>, next: Next, role: Role) -> Response {
    let authorized = request
        .extensions()
        .get::<CurrentUser>()
        .map(|current| current.0.role == role)
        .unwrap_or(false);
    if !authorized {
        return failure_response(&request, ApiError::forbidden("Access denied"));
    }
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
}
