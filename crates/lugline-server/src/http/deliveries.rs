// SPDX-License-Identifier: Apache-2.0

//! Customer-facing delivery routes: create, list, fetch, and the shared
//! status-update endpoint used by drivers and admins.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use lugline_api::errors::ApiError;
use lugline_api::params::{parse_page_params, PageParams};
use lugline_api::requests::{CreateDeliveryRequest, StatusUpdateRequest};
use lugline_api::responses::{DeliveryListResponse, DeliveryResponse};
use lugline_model::{Delivery, DeliveryStatus, Notification, NotificationKind, Priority, Role};
use serde_json::json;

use crate::http::{delivery_view, delivery_views, AppJson, Ctx, CurrentUser, Failure};
use crate::mail::{self, templates};
use crate::realtime::{EVENT_DELIVERY_STATUS_UPDATE, EVENT_NEW_DELIVERY};
use crate::AppState;

const MY_DELIVERIES_DEFAULT_LIMIT: usize = 10;

pub(crate) async fn create_delivery(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<CreateDeliveryRequest>,
) -> Result<impl IntoResponse, Failure> {
    let mut field_errors = Vec::new();
    if body.pickup_location.address.trim().is_empty() {
        field_errors.push(json!({
            "field": "pickupLocation.address",
            "message": "Pickup address is required",
        }));
    }
    if body.drop_location.address.trim().is_empty() {
        field_errors.push(json!({
            "field": "dropLocation.address",
            "message": "Drop address is required",
        }));
    }
    if body.items.is_empty() {
        field_errors.push(json!({
            "field": "items",
            "message": "At least one item is required",
        }));
    }
    for (idx, item) in body.items.iter().enumerate() {
        if item.description.trim().is_empty() {
            field_errors.push(json!({
                "field": format!("items[{idx}].description"),
                "message": "Item description is required",
            }));
        }
        if item.weight <= 0.0 {
            field_errors.push(json!({
                "field": format!("items[{idx}].weight"),
                "message": "Item weight is required",
            }));
        }
    }
    if !field_errors.is_empty() {
        return Err(ctx.fail(ApiError::validation_failed(json!(field_errors))));
    }

    let now = Utc::now();
    let delivery = Delivery::create(
        &user.id,
        body.pickup_location,
        body.drop_location,
        body.items,
        body.priority.unwrap_or(Priority::Medium),
        body.scheduled_pickup,
        now,
    )
    .map_err(|err| ctx.fail(ApiError::bad_request(err.to_string())))?;
    state.store.insert_delivery(delivery.clone()).await?;

    mail::send_best_effort(
        state.mailer.as_ref(),
        &state.jobs,
        templates::delivery_created(&user.email, &delivery),
    )
    .await;

    let admins = state.store.list_admins().await?;
    for admin in &admins {
        let notification = Notification::new(
            &admin.id,
            "New Delivery Request",
            &format!("New delivery request from {}", user.name),
            NotificationKind::Delivery,
            json!({ "deliveryId": delivery.id }),
            now,
        );
        state.store.insert_notification(notification).await?;
    }

    let view = delivery_view(&state.store, delivery).await?;
    state
        .hub
        .broadcast(EVENT_NEW_DELIVERY, serde_json::to_value(&view).unwrap_or_default());
    tracing::info!(delivery_id = %view.delivery.id, customer_id = %user.id, "delivery created");

    Ok((
        StatusCode::CREATED,
        Json(DeliveryResponse {
            message: "Delivery request created successfully".to_string(),
            delivery: view,
        }),
    ))
}

pub(crate) async fn my_deliveries(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, Failure> {
    let params = parse_page_params(&query, MY_DELIVERIES_DEFAULT_LIMIT).map_err(|e| ctx.fail(e))?;
    let status = match query.get("status") {
        Some(raw) => Some(
            DeliveryStatus::parse(raw)
                .map_err(|_| ctx.fail(ApiError::invalid_param("status", raw)))?,
        ),
        None => None,
    };

    let (deliveries, total) = match user.role {
        // Admins get the unscoped list, same filters.
        Role::Admin => {
            state
                .store
                .list_all(status, None, None, params.limit, params.offset())
                .await?
        }
        Role::Driver => {
            state
                .store
                .list_for_party(&user.id, true, status, params.limit, params.offset())
                .await?
        }
        Role::Customer => {
            state
                .store
                .list_for_party(&user.id, false, status, params.limit, params.offset())
                .await?
        }
    };

    let views = delivery_views(&state.store, deliveries).await?;
    Ok(Json(page_envelope(views, params, total)))
}

pub(crate) async fn get_delivery(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Failure> {
    let Some(delivery) = state.store.find_delivery(&id).await? else {
        return Err(ctx.fail(ApiError::not_found("Delivery")));
    };

    let has_access = user.role == Role::Admin
        || delivery.customer_id == user.id
        || delivery.driver_id.as_deref() == Some(user.id.as_str());
    if !has_access {
        return Err(ctx.fail(ApiError::forbidden("Access denied")));
    }

    let view = delivery_view(&state.store, delivery).await?;
    Ok(Json(json!({ "delivery": view })))
}

pub(crate) async fn update_status(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(body): AppJson<StatusUpdateRequest>,
) -> Result<impl IntoResponse, Failure> {
    if body.status == DeliveryStatus::Pending {
        return Err(ctx.fail(ApiError::bad_request("Invalid status")));
    }

    let Some(mut delivery) = state.store.find_delivery(&id).await? else {
        return Err(ctx.fail(ApiError::not_found("Delivery")));
    };

    let is_assigned_driver = delivery.driver_id.as_deref() == Some(user.id.as_str());
    if user.role != Role::Admin && !is_assigned_driver {
        return Err(ctx.fail(ApiError::forbidden("Not authorized")));
    }

    let now = Utc::now();
    let previous_driver = delivery.driver_id.clone();
    delivery
        .transition_to(body.status, body.notes.as_deref(), now)
        .map_err(|err| ctx.fail(ApiError::bad_request(err.to_string())))?;
    state.store.update_delivery(delivery.clone()).await?;

    // Terminal states hand the driver back to the pool.
    match body.status {
        DeliveryStatus::Delivered => {
            if let Some(driver_id) = &previous_driver {
                state.store.record_driver_delivered(driver_id, now).await?;
            }
        }
        DeliveryStatus::Cancelled => {
            if let Some(driver_id) = &previous_driver {
                state
                    .store
                    .set_driver_availability(driver_id, true, now)
                    .await?;
            }
        }
        _ => {}
    }

    if let Some(customer) = state.store.find_user_by_id(&delivery.customer_id).await? {
        mail::send_best_effort(
            state.mailer.as_ref(),
            &state.jobs,
            templates::status_update(&customer.email, &delivery, body.status),
        )
        .await;
    }

    let payload = json!({
        "deliveryId": delivery.id,
        "status": body.status,
        "timestamp": now,
    });
    state
        .hub
        .to_user(&delivery.customer_id, EVENT_DELIVERY_STATUS_UPDATE, payload.clone());
    state
        .hub
        .to_delivery(&delivery.id, EVENT_DELIVERY_STATUS_UPDATE, payload);
    tracing::info!(
        delivery_id = %delivery.id,
        status = %body.status,
        updated_by = %user.id,
        "delivery status updated"
    );

    let view = delivery_view(&state.store, delivery).await?;
    Ok(Json(DeliveryResponse {
        message: "Status updated successfully".to_string(),
        delivery: view,
    }))
}

pub(crate) fn page_envelope(
    views: Vec<lugline_api::responses::DeliveryView>,
    params: PageParams,
    total: usize,
) -> DeliveryListResponse {
    DeliveryListResponse {
        deliveries: views,
        total_pages: params.total_pages(total),
        current_page: params.page,
        total,
    }
}
