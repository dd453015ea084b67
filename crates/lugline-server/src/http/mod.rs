// SPDX-License-Identifier: Apache-2.0

//! Shared handler plumbing: the error envelope, request-context threading, and
//! the extractors handlers lean on.

pub(crate) mod admin;
pub(crate) mod assistant;
pub(crate) mod auth;
pub(crate) mod deliveries;
pub(crate) mod drivers;
pub(crate) mod health;
pub(crate) mod notifications;

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lugline_api::errors::ApiError;
use lugline_api::responses::{DeliveryView, UserSummary};
use lugline_model::{Delivery, User, ValidationError};
use lugline_store::{Store, StoreError};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Per-request trace data, inserted by the tracing middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestContext {
    pub request_id: String,
}

/// Honors a caller-supplied `x-request-id`, otherwise mints one from the seed.
#[must_use]
pub(crate) fn extract_request_id(headers: &HeaderMap, seed: &AtomicU64) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| {
            let id = seed.fetch_add(1, Ordering::Relaxed);
            format!("req-{id:016x}")
        })
}

/// Handler error carrying the wire envelope.
#[derive(Debug)]
pub(crate) struct Failure(pub ApiError);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        api_error_response(&self.0)
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store operation failed");
        Failure(ApiError::internal("Internal server error"))
    }
}

impl From<ValidationError> for Failure {
    fn from(err: ValidationError) -> Self {
        Failure(ApiError::bad_request(err.to_string()))
    }
}

pub(crate) fn api_error_response(err: &ApiError) -> Response {
    let status = StatusCode::from_u16(err.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err }))).into_response()
}

/// Envelope response for failures raised inside middleware, where the request
/// is still in hand and carries the context extension.
pub(crate) fn failure_response(request: &Request<Body>, err: ApiError) -> Response {
    let err = match request.extensions().get::<RequestContext>() {
        Some(ctx) => err.with_request_id(&ctx.request_id),
        None => err,
    };
    api_error_response(&err)
}

/// Request-id handle for handlers; stamps every error they raise.
pub(crate) struct Ctx {
    pub request_id: String,
}

impl Ctx {
    pub(crate) fn fail(&self, err: ApiError) -> Failure {
        Failure(err.with_request_id(&self.request_id))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .extensions
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id.clone())
            .unwrap_or_else(|| "req-unknown".to_string());
        Ok(Self { request_id })
    }
}

/// The authenticated user, inserted by the session middleware.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| Failure(ApiError::unauthorized("Authentication required")))
    }
}

/// The raw session token, kept around so logout can revoke it.
#[derive(Debug, Clone)]
pub(crate) struct SessionToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(|| Failure(ApiError::unauthorized("Authentication required")))
    }
}

/// JSON body extractor that keeps rejections inside the error envelope.
pub(crate) struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = req
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id.clone());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let mut err = ApiError::bad_request(rejection.body_text());
                if let Some(id) = request_id {
                    err = err.with_request_id(&id);
                }
                Err(Failure(err))
            }
        }
    }
}

/// Joins the customer and driver summaries onto a delivery for the wire.
pub(crate) async fn delivery_view(store: &Store, delivery: Delivery) -> Result<DeliveryView, Failure> {
    let customer = store
        .find_user_by_id(&delivery.customer_id)
        .await?
        .map(|user| UserSummary::from_user(&user));
    let driver = match &delivery.driver_id {
        Some(id) => store
            .find_user_by_id(id)
            .await?
            .map(|user| UserSummary::from_user(&user)),
        None => None,
    };
    Ok(DeliveryView {
        delivery,
        customer,
        driver,
    })
}

pub(crate) async fn delivery_views(
    store: &Store,
    deliveries: Vec<Delivery>,
) -> Result<Vec<DeliveryView>, Failure> {
    let mut views = Vec::with_capacity(deliveries.len());
    for delivery in deliveries {
        views.push(delivery_view(store, delivery).await?);
    }
    Ok(views)
}
