// SPDX-License-Identifier: Apache-2.0

//! The hourly assignment sweep. Deliveries still pending past the cutoff get
//! handed to the first available driver; with no driver on hand they are
//! escalated to every admin instead.

use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use lugline_api::responses::UserSummary;
use lugline_model::{Delivery, Notification, NotificationKind, User};
use lugline_store::StoreError;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::mail::{self, templates};
use crate::realtime::{EVENT_DELIVERY_ASSIGNED, EVENT_DELIVERY_ESCALATION, EVENT_NEW_ASSIGNMENT};
use crate::AppState;

enum Outcome {
    Assigned,
    Escalated,
}

pub fn spawn(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(state.config.auto_assign_interval_secs));
        loop {
            interval.tick().await;
            if let Err(err) = sweep(&state).await {
                tracing::error!(error = %err, "auto-assignment sweep failed");
            }
        }
    })
}

/// One pass over stale pending deliveries. Returns (assigned, escalated).
pub async fn sweep(state: &AppState) -> Result<(usize, usize), StoreError> {
    state.jobs.auto_assign_runs.fetch_add(1, Ordering::Relaxed);
    let cutoff = Utc::now() - chrono::Duration::hours(state.config.auto_assign_cutoff_hours);
    let stale = state.store.list_stale_pending(cutoff).await?;

    let mut assigned = 0usize;
    let mut escalated = 0usize;
    for delivery in stale {
        let delivery_id = delivery.id.clone();
        // One bad delivery must not stall the rest of the sweep.
        match process_delivery(state, delivery).await {
            Ok(Outcome::Assigned) => assigned += 1,
            Ok(Outcome::Escalated) => escalated += 1,
            Err(err) => {
                tracing::warn!(error = %err, delivery_id = %delivery_id, "sweep skipped a delivery");
            }
        }
    }

    tracing::info!(assigned, escalated, "auto-assignment sweep complete");
    Ok((assigned, escalated))
}

async fn process_delivery(state: &AppState, delivery: Delivery) -> Result<Outcome, StoreError> {
    match state.store.first_available_driver().await? {
        Some(driver) => assign(state, delivery, driver).await.map(|()| Outcome::Assigned),
        None => escalate(state, delivery).await.map(|()| Outcome::Escalated),
    }
}

async fn assign(state: &AppState, mut delivery: Delivery, driver: User) -> Result<(), StoreError> {
    let now = Utc::now();
    if delivery
        .assign_to(&driver.id, "Auto-assigned by system", true, now)
        .is_err()
    {
        // Raced with a manual assignment since the stale query ran.
        return Ok(());
    }
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
            "autoAssigned": true,
        }),
    );
    state.hub.to_user(
        &driver.id,
        EVENT_NEW_ASSIGNMENT,
        json!({
            "deliveryId": delivery.id,
            "message": "You have been auto-assigned a delivery",
        }),
    );

    state
        .jobs
        .deliveries_auto_assigned
        .fetch_add(1, Ordering::Relaxed);
    tracing::info!(delivery_id = %delivery.id, driver_id = %driver.id, "delivery auto-assigned");
    Ok(())
}

async fn escalate(state: &AppState, mut delivery: Delivery) -> Result<(), StoreError> {
    let now = Utc::now();
    delivery.escalate_to_urgent(now);
    state.store.update_delivery(delivery.clone()).await?;

    let message = format!(
        "Delivery {} has been pending for 24+ hours with no available drivers",
        delivery.id
    );
    let admins = state.store.list_admins().await?;
    for admin in &admins {
        let notification = Notification::new(
            &admin.id,
            "Urgent: No Drivers Available",
            &message,
            NotificationKind::System,
            json!({ "deliveryId": delivery.id, "actionRequired": true }),
            now,
        )
        .with_priority("high");
        state.store.insert_notification(notification).await?;

        mail::send_best_effort(
            state.mailer.as_ref(),
            &state.jobs,
            templates::escalation(&admin.email, &delivery),
        )
        .await;
    }

    state.hub.to_admins(
        EVENT_DELIVERY_ESCALATION,
        json!({
            "deliveryId": delivery.id,
            "message": message,
        }),
    );

    state
        .jobs
        .deliveries_escalated
        .fetch_add(1, Ordering::Relaxed);
    tracing::info!(delivery_id = %delivery.id, "delivery escalated, no drivers available");
    Ok(())
}
