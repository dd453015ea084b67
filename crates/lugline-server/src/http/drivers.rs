// SPDX-License-Identifier: Apache-2.0

//! Driver routes: the open-work queue, accept/complete, and availability.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use lugline_api::errors::ApiError;
use lugline_api::requests::{AvailabilityRequest, LocationUpdateRequest};
use lugline_api::responses::{
    DeliveryResponse, DriverStats, DriverStatsResponse, MessageResponse, UserSummary,
};
use lugline_model::{DeliveryStatus, DriverLocation};
use serde_json::json;

use crate::http::{delivery_view, delivery_views, AppJson, Ctx, CurrentUser, Failure};
use crate::mail::{self, templates};
use crate::realtime::{EVENT_DELIVERY_ASSIGNED, EVENT_DELIVERY_COMPLETED, EVENT_DRIVER_LOCATION};
use crate::AppState;

const AVAILABLE_DELIVERIES_LIMIT: usize = 20;

pub(crate) async fn available_deliveries(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<impl IntoResponse, Failure> {
    let deliveries = state.store.list_available(AVAILABLE_DELIVERIES_LIMIT).await?;
    let views = delivery_views(&state.store, deliveries).await?;
    Ok(Json(json!({ "deliveries": views })))
}

pub(crate) async fn accept_delivery(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    Path(delivery_id): Path<String>,
) -> Result<impl IntoResponse, Failure> {
    let Some(mut delivery) = state.store.find_delivery(&delivery_id).await? else {
        return Err(ctx.fail(ApiError::not_found("Delivery")));
    };
    if delivery.status != DeliveryStatus::Pending || delivery.driver_id.is_some() {
        return Err(ctx.fail(ApiError::bad_request("Delivery no longer available")));
    }
    if !user.is_available_driver() {
        return Err(ctx.fail(ApiError::bad_request("Driver not available")));
    }

    let now = Utc::now();
    let note = format!("Accepted by driver {}", user.name);
    delivery
        .assign_to(&user.id, &note, false, now)
        .map_err(|err| ctx.fail(ApiError::bad_request(err.to_string())))?;
    state.store.update_delivery(delivery.clone()).await?;
    state
        .store
        .set_driver_availability(&user.id, false, now)
        .await?;

    if let Some(customer) = state.store.find_user_by_id(&delivery.customer_id).await? {
        mail::send_best_effort(
            state.mailer.as_ref(),
            &state.jobs,
            templates::driver_assigned(&customer.email, &delivery, &user),
        )
        .await;
    }

    state.hub.to_user(
        &delivery.customer_id,
        EVENT_DELIVERY_ASSIGNED,
        json!({
            "deliveryId": delivery.id,
            "driver": UserSummary::from_user(&user),
        }),
    );
    tracing::info!(delivery_id = %delivery.id, driver_id = %user.id, "delivery accepted");

    let view = delivery_view(&state.store, delivery).await?;
    Ok(Json(DeliveryResponse {
        message: "Delivery accepted successfully".to_string(),
        delivery: view,
    }))
}

pub(crate) async fn update_location(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<LocationUpdateRequest>,
) -> Result<impl IntoResponse, Failure> {
    if !body.latitude.is_finite() || !body.longitude.is_finite() {
        return Err(ctx.fail(ApiError::bad_request("Coordinates must be finite numbers")));
    }
    let now = Utc::now();
    let location = DriverLocation {
        latitude: body.latitude,
        longitude: body.longitude,
        address: body.address.unwrap_or_default(),
        last_updated: now,
    };
    if state
        .store
        .set_driver_location(&user.id, location.clone(), now)
        .await?
        .is_none()
    {
        return Err(ctx.fail(ApiError::not_found("Driver")));
    }

    // Customers watching any of this driver's live deliveries get the fix too.
    let delivery_ids = state.store.active_delivery_ids_for_driver(&user.id).await?;
    for delivery_id in &delivery_ids {
        state.hub.to_delivery(
            delivery_id,
            EVENT_DRIVER_LOCATION,
            json!({
                "driverId": user.id,
                "location": {
                    "latitude": location.latitude,
                    "longitude": location.longitude,
                    "address": location.address,
                },
                "timestamp": now,
            }),
        );
    }
    Ok(Json(MessageResponse::new("Location updated successfully")))
}

pub(crate) async fn complete_delivery(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    Path(delivery_id): Path<String>,
) -> Result<impl IntoResponse, Failure> {
    let Some(mut delivery) = state.store.find_delivery(&delivery_id).await? else {
        return Err(ctx.fail(ApiError::not_found("Delivery")));
    };
    if delivery.driver_id.as_deref() != Some(user.id.as_str()) {
        return Err(ctx.fail(ApiError::forbidden("Not authorized")));
    }
    if delivery.status != DeliveryStatus::InTransit {
        return Err(ctx.fail(ApiError::bad_request("Delivery not in transit")));
    }

    let now = Utc::now();
    delivery
        .transition_to(DeliveryStatus::Delivered, Some("Delivered by driver"), now)
        .map_err(|err| ctx.fail(ApiError::bad_request(err.to_string())))?;
    state.store.update_delivery(delivery.clone()).await?;
    state.store.record_driver_delivered(&user.id, now).await?;

    if let Some(customer) = state.store.find_user_by_id(&delivery.customer_id).await? {
        mail::send_best_effort(
            state.mailer.as_ref(),
            &state.jobs,
            templates::delivery_completed(&customer.email, &delivery),
        )
        .await;
    }

    state.hub.to_user(
        &delivery.customer_id,
        EVENT_DELIVERY_COMPLETED,
        json!({
            "deliveryId": delivery.id,
            "completedAt": delivery.actual_delivery_time,
        }),
    );
    tracing::info!(delivery_id = %delivery.id, driver_id = %user.id, "delivery completed");

    let view = delivery_view(&state.store, delivery).await?;
    Ok(Json(DeliveryResponse {
        message: "Delivery completed successfully".to_string(),
        delivery: view,
    }))
}

pub(crate) async fn set_availability(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<AvailabilityRequest>,
) -> Result<impl IntoResponse, Failure> {
    let updated = state
        .store
        .set_driver_availability(&user.id, body.is_available, Utc::now())
        .await?;
    if updated.is_none() {
        return Err(ctx.fail(ApiError::not_found("Driver")));
    }
    Ok(Json(json!({
        "message": "Availability updated successfully",
        "isAvailable": body.is_available,
    })))
}

pub(crate) async fn driver_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, Failure> {
    let completed = state
        .store
        .count_for_driver_in(&user.id, &[DeliveryStatus::Delivered])
        .await?;
    let active = state
        .store
        .count_for_driver_in(
            &user.id,
            &[
                DeliveryStatus::Assigned,
                DeliveryStatus::PickedUp,
                DeliveryStatus::InTransit,
            ],
        )
        .await?;
    let profile = user.driver_profile.as_ref();
    let stats = DriverStats {
        total_deliveries: profile.map(|p| p.total_deliveries).unwrap_or_default(),
        completed_deliveries: completed,
        active_deliveries: active,
        rating: profile.map(|p| p.rating).unwrap_or(5.0),
    };
    Ok(Json(DriverStatsResponse { stats }))
}
