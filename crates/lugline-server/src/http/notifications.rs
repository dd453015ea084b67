// SPDX-License-Identifier: Apache-2.0

//! Stored bell-dropdown notifications.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lugline_api::errors::ApiError;
use lugline_api::responses::{MessageResponse, NotificationListResponse};

use crate::http::{Ctx, CurrentUser, Failure};
use crate::AppState;

const NOTIFICATION_LIST_LIMIT: usize = 50;

pub(crate) async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, Failure> {
    let notifications = state
        .store
        .list_notifications(&user.id, NOTIFICATION_LIST_LIMIT)
        .await?;
    let unread_count = state.store.count_unread_notifications(&user.id).await?;
    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

pub(crate) async fn mark_read(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Failure> {
    if !state.store.mark_notification_read(&id, &user.id).await? {
        return Err(ctx.fail(ApiError::not_found("Notification")));
    }
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

pub(crate) async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, Failure> {
    let updated = state.store.mark_all_notifications_read(&user.id).await?;
    tracing::debug!(user_id = %user.id, updated, "notifications marked read");
    Ok(Json(MessageResponse::new("All notifications marked as read")))
}
