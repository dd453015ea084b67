// SPDX-License-Identifier: Apache-2.0

//! Lassy endpoints. The LLM call degrades to a canned reply on any upstream
//! failure; these routes never surface a 5xx for provider trouble.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use lugline_api::errors::ApiError;
use lugline_api::requests::LassyRequest;
use lugline_api::responses::{AssistantResponse, SuggestionsResponse};

use crate::assistant::actions::{suggested_action, suggestions_for};
use crate::assistant::prompt::system_prompt;
use crate::assistant::FALLBACK_REPLY;
use crate::http::{AppJson, Ctx, CurrentUser, Failure};
use crate::AppState;

pub(crate) async fn lassy(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<LassyRequest>,
) -> Result<impl IntoResponse, Failure> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ctx.fail(ApiError::bad_request("Message is required")));
    }

    let prompt = system_prompt(&user.name, user.role, &body.context);
    let (response, suggested) = match state.assistant.reply(&prompt, message).await {
        Ok(reply) => {
            let action = suggested_action(message);
            (reply, action)
        }
        Err(err) => {
            tracing::warn!(error = %err, user_id = %user.id, "assistant call failed, using fallback");
            (FALLBACK_REPLY.to_string(), None)
        }
    };

    Ok(Json(AssistantResponse {
        response,
        suggested_action: suggested,
        timestamp: Utc::now(),
    }))
}

pub(crate) async fn suggestions(
    CurrentUser(user): CurrentUser,
    Path(context): Path<String>,
) -> impl IntoResponse {
    let suggestions = suggestions_for(&context, user.role)
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(SuggestionsResponse { suggestions })
}
