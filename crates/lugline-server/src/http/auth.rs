// SPDX-License-Identifier: Apache-2.0

//! Registration, login, and session endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use lugline_api::errors::ApiError;
use lugline_api::requests::{LoginRequest, RegisterRequest};
use lugline_api::responses::{AuthResponse, MessageResponse};
use lugline_model::{Role, User};
use serde_json::json;

use crate::http::{AppJson, Ctx, CurrentUser, Failure, SessionToken};
use crate::security;
use crate::AppState;

pub(crate) async fn register(
    State(state): State<AppState>,
    ctx: Ctx,
    AppJson(body): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, Failure> {
    let mut field_errors = Vec::new();
    if body.name.trim().is_empty() {
        field_errors.push(json!({ "field": "name", "message": "Name is required" }));
    }
    if body.email.trim().is_empty() {
        field_errors.push(json!({ "field": "email", "message": "Email is required" }));
    }
    if body.password.is_empty() {
        field_errors.push(json!({ "field": "password", "message": "Password is required" }));
    }
    if !field_errors.is_empty() {
        return Err(ctx.fail(ApiError::validation_failed(json!(field_errors))));
    }

    let role = body.role.unwrap_or(Role::Customer);
    if role == Role::Admin {
        return Err(ctx.fail(ApiError::bad_request("Role must be customer or driver")));
    }

    let now = Utc::now();
    let mut user = User::new(&body.name, &body.email, role, now);
    user.phone = body
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if let (Some(profile), Some(info)) = (user.driver_profile.as_mut(), body.driver_info) {
        profile.vehicle_type = info.vehicle_type;
        profile.vehicle_number = info.vehicle_number;
        profile.license_number = info.license_number;
    }

    let password_hash = security::hash_password(&body.password);
    if let Err(err) = state.store.insert_user(user.clone(), password_hash).await {
        if err.is_constraint_violation() {
            return Err(ctx.fail(ApiError::bad_request("Email already registered")));
        }
        return Err(err.into());
    }

    let token = open_session(&state, &user.id).await?;
    tracing::info!(user_id = %user.id, role = %user.role.as_str(), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
            user,
        }),
    ))
}

pub(crate) async fn login(
    State(state): State<AppState>,
    ctx: Ctx,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, Failure> {
    let email = body.email.trim().to_ascii_lowercase();
    let Some((user, password_hash)) = state.store.find_login_by_email(&email).await? else {
        return Err(ctx.fail(ApiError::unauthorized("Invalid credentials")));
    };
    if !security::verify_password(&body.password, &password_hash) {
        return Err(ctx.fail(ApiError::unauthorized("Invalid credentials")));
    }
    if !user.is_active {
        return Err(ctx.fail(ApiError::forbidden("Account is deactivated")));
    }

    let token = open_session(&state, &user.id).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

pub(crate) async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(json!({ "user": user }))
}

pub(crate) async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, Failure> {
    state.store.delete_session(&token).await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

async fn open_session(state: &AppState, user_id: &str) -> Result<String, Failure> {
    let token = security::generate_token();
    let now = Utc::now();
    let expires_at = now + Duration::seconds(state.config.session_ttl_secs);
    state
        .store
        .insert_session(&token, user_id, now, expires_at)
        .await?;
    Ok(token)
}
