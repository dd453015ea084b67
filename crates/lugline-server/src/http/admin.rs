// SPDX-License-Identifier: Apache-2.0

//! Admin oversight: dashboard stats, fleet-wide listings, manual assignment,
//! and account activation.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use lugline_api::errors::ApiError;
use lugline_api::params::{parse_delivery_filters, parse_page_params, parse_user_filters};
use lugline_api::requests::{AssignDeliveryRequest, UserStatusRequest};
use lugline_api::responses::{
    DashboardResponse, DashboardStats, DeliveryResponse, UserListResponse, UserSummary,
};
use lugline_model::{DeliveryStatus, Role};
use serde_json::json;

use crate::http::deliveries::page_envelope;
use crate::http::{delivery_view, delivery_views, AppJson, Ctx, CurrentUser, Failure};
use crate::mail::{self, templates};
use crate::realtime::{EVENT_DELIVERY_ASSIGNED, EVENT_NEW_ASSIGNMENT};
use crate::AppState;

const ADMIN_PAGE_LIMIT: usize = 20;
const RECENT_DELIVERIES_LIMIT: usize = 10;

pub(crate) async fn dashboard(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Failure> {
    let overdue_cutoff = Utc::now() - Duration::hours(state.config.auto_assign_cutoff_hours);
    let stats = DashboardStats {
        total_users: state.store.count_users().await?,
        total_drivers: state.store.count_drivers().await?,
        active_drivers: state.store.count_available_drivers().await?,
        total_deliveries: state.store.count_deliveries().await?,
        pending_deliveries: state.store.count_by_status(DeliveryStatus::Pending).await?,
        overdue_deliveries: state.store.count_overdue_pending(overdue_cutoff).await?,
    };
    let recent = state.store.recent_deliveries(RECENT_DELIVERIES_LIMIT).await?;
    let recent_deliveries = delivery_views(&state.store, recent).await?;
    Ok(Json(DashboardResponse {
        stats,
        recent_deliveries,
    }))
}

pub(crate) async fn list_deliveries(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, Failure> {
    let params = parse_page_params(&query, ADMIN_PAGE_LIMIT).map_err(|e| ctx.fail(e))?;
    let filters = parse_delivery_filters(&query).map_err(|e| ctx.fail(e))?;
    let (deliveries, total) = state
        .store
        .list_all(
            filters.status,
            filters.priority,
            filters.search,
            params.limit,
            params.offset(),
        )
        .await?;
    let views = delivery_views(&state.store, deliveries).await?;
    Ok(Json(page_envelope(views, params, total)))
}

pub(crate) async fn assign_delivery(
    State(state): State<AppState>,
    ctx: Ctx,
    AppJson(body): AppJson<AssignDeliveryRequest>,
) -> Result<impl IntoResponse, Failure> {
    let delivery = state.store.find_delivery(&body.delivery_id).await?;
    let driver = state.store.find_user_by_id(&body.driver_id).await?;
    let (Some(mut delivery), Some(driver)) = (delivery, driver) else {
        return Err(ctx.fail(ApiError::not_found("Delivery or driver")));
    };

    if delivery.status != DeliveryStatus::Pending {
        return Err(ctx.fail(ApiError::bad_request("Delivery cannot be assigned")));
    }
    if driver.role != Role::Driver {
        return Err(ctx.fail(ApiError::bad_request("User is not a driver")));
    }

    let now = Utc::now();
    delivery
        .assign_to(&driver.id, "Assigned by admin", true, now)
        .map_err(|err| ctx.fail(ApiError::bad_request(err.to_string())))?;
    state.store.update_delivery(delivery.clone()).await?;
    state
        .store
        .set_driver_availability(&driver.id, false, now)
        .await?;

    if let Some(customer) = state.store.find_user_by_id(&delivery.customer_id).await? {
        mail::send_best_effort(
            state.mailer.as_ref(),
            &state.jobs,
            templates::driver_assigned(&customer.email, &delivery, &driver),
        )
        .await;
    }
    mail::send_best_effort(
        state.mailer.as_ref(),
        &state.jobs,
        templates::new_assignment(&driver.email, &delivery),
    )
    .await;

    state.hub.to_user(
        &delivery.customer_id,
        EVENT_DELIVERY_ASSIGNED,
        json!({
            "deliveryId": delivery.id,
            "driver": UserSummary::from_user(&driver),
        }),
    );
    state.hub.to_user(
        &driver.id,
        EVENT_NEW_ASSIGNMENT,
        json!({
            "deliveryId": delivery.id,
            "message": "You have been assigned a new delivery",
        }),
    );
    tracing::info!(delivery_id = %delivery.id, driver_id = %driver.id, "delivery assigned by admin");

    let view = delivery_view(&state.store, delivery).await?;
    Ok(Json(DeliveryResponse {
        message: "Delivery assigned successfully".to_string(),
        delivery: view,
    }))
}

pub(crate) async fn list_users(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, Failure> {
    let params = parse_page_params(&query, ADMIN_PAGE_LIMIT).map_err(|e| ctx.fail(e))?;
    let filters = parse_user_filters(&query).map_err(|e| ctx.fail(e))?;
    let (users, total) = state
        .store
        .list_users(filters.role, filters.search, params.limit, params.offset())
        .await?;
    Ok(Json(UserListResponse {
        users,
        total_pages: params.total_pages(total),
        current_page: params.page,
        total,
    }))
}

pub(crate) async fn set_user_status(
    State(state): State<AppState>,
    ctx: Ctx,
    CurrentUser(admin): CurrentUser,
    Path(user_id): Path<String>,
    AppJson(body): AppJson<UserStatusRequest>,
) -> Result<impl IntoResponse, Failure> {
    if user_id == admin.id {
        return Err(ctx.fail(ApiError::bad_request(
            "Cannot change your own account status",
        )));
    }
    let Some(user) = state
        .store
        .set_user_active(&user_id, body.is_active, Utc::now())
        .await?
    else {
        return Err(ctx.fail(ApiError::not_found("User")));
    };
    tracing::info!(user_id = %user.id, is_active = body.is_active, "account status changed");
    Ok(Json(json!({
        "message": "User status updated successfully",
        "user": user,
    })))
}
