// SPDX-License-Identifier: Apache-2.0

mod support;

use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use lugline_model::{DeliveryStatus, Notification, NotificationKind, Priority};
use lugline_server::{jobs, seed_admin};
use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::json;
use support::{
    backdated_delivery, customer_payload, delivery_payload, driver_payload, register_user, send,
    spawn_app, TestApp,
};

const ADMIN_EMAIL: &str = "root@lugline.example";
const ADMIN_PASSWORD: &str = "masterkey-9";

async fn admin_token(app: &TestApp) -> String {
    seed_admin(&app.state.store, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("seed admin");
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, 200, "admin login: {body}");
    body["token"].as_str().expect("session token").to_string()
}

#[tokio::test]
async fn dashboard_assignment_and_user_management() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let (customer_token, customer) =
        register_user(&app, customer_payload("casey@example.com")).await;
    let (_, driver) = register_user(&app, driver_payload("devon@example.com")).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/delivery",
        Some(&customer_token),
        Some(delivery_payload()),
    )
    .await;
    assert_eq!(status, 201);
    let delivery_id = body["delivery"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/admin/dashboard", Some(&admin), None).await;
    assert_eq!(status, 200, "dashboard: {body}");
    assert_eq!(body["stats"]["totalUsers"], 3);
    assert_eq!(body["stats"]["totalDrivers"], 1);
    assert_eq!(body["stats"]["activeDrivers"], 1);
    assert_eq!(body["stats"]["totalDeliveries"], 1);
    assert_eq!(body["stats"]["pendingDeliveries"], 1);
    assert_eq!(body["stats"]["overdueDeliveries"], 0);
    assert_eq!(body["recentDeliveries"].as_array().unwrap().len(), 1);

    // Booking raised a bell notification for the admin.
    let (_, body) = send(&app, Method::GET, "/api/notifications", Some(&admin), None).await;
    assert_eq!(body["unreadCount"], 1);
    let note = body["notifications"][0].clone();
    assert_eq!(note["title"], "New Delivery Request");
    assert_eq!(note["data"]["deliveryId"], delivery_id.as_str());
    let note_id = note["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/notifications/{note_id}/read"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Notification marked as read");
    let (_, body) = send(&app, Method::GET, "/api/notifications", Some(&admin), None).await;
    assert_eq!(body["unreadCount"], 0);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/notifications/no-such-id/read",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["message"], "Notification not found");

    // Manual assignment stamps the delivery and busies the driver.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/assign-delivery",
        Some(&admin),
        Some(json!({ "deliveryId": delivery_id, "driverId": driver["id"] })),
    )
    .await;
    assert_eq!(status, 200, "assign: {body}");
    assert_eq!(body["message"], "Delivery assigned successfully");
    assert_eq!(body["delivery"]["status"], "assigned");
    assert!(body["delivery"]["autoAssignedAt"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/assign-delivery",
        Some(&admin),
        Some(json!({ "deliveryId": delivery_id, "driverId": driver["id"] })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "Delivery cannot be assigned");

    // A fresh pending delivery cannot go to a non-driver or a ghost.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/delivery",
        Some(&customer_token),
        Some(delivery_payload()),
    )
    .await;
    assert_eq!(status, 201);
    let second_id = body["delivery"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/assign-delivery",
        Some(&admin),
        Some(json!({ "deliveryId": second_id, "driverId": customer["id"] })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "User is not a driver");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/assign-delivery",
        Some(&admin),
        Some(json!({ "deliveryId": second_id, "driverId": "no-such-user" })),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["message"], "Delivery or driver not found");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/notifications/read-all",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "All notifications marked as read");
    let (_, body) = send(&app, Method::GET, "/api/notifications", Some(&admin), None).await;
    assert_eq!(body["unreadCount"], 0);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/admin/deliveries?status=assigned",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 1);
    assert_eq!(body["deliveries"][0]["id"], delivery_id.as_str());

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/admin/deliveries?status=lost",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/admin/users?role=driver",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 1);
    assert_eq!(body["users"][0]["role"], "driver");

    // Deactivation locks the account out of login and live sessions.
    let customer_id = customer["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/users/{customer_id}/status"),
        Some(&admin),
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(status, 200, "deactivate: {body}");
    assert_eq!(body["message"], "User status updated successfully");
    assert_eq!(body["user"]["isActive"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "casey@example.com", "password": "sekrit-pass-1" })),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["message"], "Account is deactivated");
    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&customer_token), None).await;
    assert_eq!(status, 403);

    // Admins cannot lock themselves out.
    let (_, body) = send(&app, Method::GET, "/api/auth/me", Some(&admin), None).await;
    let admin_id = body["user"]["id"].as_str().unwrap().to_string();
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/users/{admin_id}/status"),
        Some(&admin),
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(
        body["error"]["message"],
        "Cannot change your own account status"
    );
}

#[tokio::test]
async fn sweep_assigns_stale_deliveries_then_escalates_when_no_driver_is_free() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let (_, customer) = register_user(&app, customer_payload("casey@example.com")).await;
    let (_, driver) = register_user(&app, driver_payload("devon@example.com")).await;
    let customer_id = customer["id"].as_str().unwrap();

    // A request that has sat unassigned past the cutoff.
    let stale = backdated_delivery(customer_id, Utc::now() - Duration::hours(30));
    app.state
        .store
        .insert_delivery(stale.clone())
        .await
        .expect("insert stale delivery");

    let (assigned, escalated) = jobs::auto_assign::sweep(&app.state).await.expect("sweep");
    assert_eq!((assigned, escalated), (1, 0));

    let after = app
        .state
        .store
        .find_delivery(&stale.id)
        .await
        .expect("find delivery")
        .expect("delivery exists");
    assert_eq!(after.status, DeliveryStatus::Assigned);
    assert_eq!(after.driver_id.as_deref(), driver["id"].as_str());
    assert!(after.auto_assigned_at.is_some());
    assert_eq!(
        after.tracking.last().and_then(|t| t.notes.as_deref()),
        Some("Auto-assigned by system")
    );

    let busy = app
        .state
        .store
        .find_user_by_id(driver["id"].as_str().unwrap())
        .await
        .expect("find driver")
        .expect("driver exists");
    assert!(!busy.is_available_driver());

    // With the only driver busy, the next stale request escalates instead.
    let orphan = backdated_delivery(customer_id, Utc::now() - Duration::hours(26));
    app.state
        .store
        .insert_delivery(orphan.clone())
        .await
        .expect("insert orphan delivery");

    let (assigned, escalated) = jobs::auto_assign::sweep(&app.state).await.expect("sweep");
    assert_eq!((assigned, escalated), (0, 1));

    let after = app
        .state
        .store
        .find_delivery(&orphan.id)
        .await
        .expect("find delivery")
        .expect("delivery exists");
    assert!(after.is_urgent);
    assert_eq!(after.priority, Priority::Urgent);
    assert!(after.delivery_fee > orphan.delivery_fee);

    let (_, body) = send(&app, Method::GET, "/api/notifications", Some(&admin), None).await;
    let titles: Vec<&str> = body["notifications"]
        .as_array()
        .expect("notifications")
        .iter()
        .filter_map(|n| n["title"].as_str())
        .collect();
    assert!(titles.contains(&"Urgent: No Drivers Available"), "{titles:?}");

    let subjects = app.mailer.subjects();
    assert!(subjects.contains(&"Driver Assigned - Lugline".to_string()));
    assert!(subjects.contains(&"URGENT: Delivery Assignment Needed".to_string()));

    let metrics = &app.state.jobs;
    assert_eq!(metrics.auto_assign_runs.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.deliveries_auto_assigned.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.deliveries_escalated.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn cleanup_purges_old_read_notifications_and_expired_sessions() {
    let app = spawn_app().await;
    let (_, customer) = register_user(&app, customer_payload("casey@example.com")).await;
    let user_id = customer["id"].as_str().unwrap();

    let long_ago = Utc::now() - Duration::days(40);
    let stale = Notification::new(
        user_id,
        "Old news",
        "Read long ago",
        NotificationKind::System,
        json!({}),
        long_ago,
    );
    let stale_id = stale.id.clone();
    app.state
        .store
        .insert_notification(stale)
        .await
        .expect("insert stale notification");
    assert!(app
        .state
        .store
        .mark_notification_read(&stale_id, user_id)
        .await
        .expect("mark read"));

    // Unread-but-old and fresh-and-read both survive the sweep.
    let unread = Notification::new(
        user_id,
        "Still pending",
        "Never opened",
        NotificationKind::System,
        json!({}),
        long_ago,
    );
    app.state
        .store
        .insert_notification(unread)
        .await
        .expect("insert unread notification");
    let fresh = Notification::new(
        user_id,
        "Fresh",
        "Keep me",
        NotificationKind::System,
        json!({}),
        Utc::now(),
    );
    let fresh_id = fresh.id.clone();
    app.state
        .store
        .insert_notification(fresh)
        .await
        .expect("insert fresh notification");
    assert!(app
        .state
        .store
        .mark_notification_read(&fresh_id, user_id)
        .await
        .expect("mark fresh read"));

    app.state
        .store
        .insert_session("expired-token", user_id, long_ago, long_ago + Duration::days(7))
        .await
        .expect("insert expired session");

    let (notifications, sessions) = jobs::cleanup::sweep(&app.state).await.expect("sweep");
    assert_eq!((notifications, sessions), (1, 1));

    let remaining = app
        .state
        .store
        .list_notifications(user_id, 50)
        .await
        .expect("list notifications");
    let titles: Vec<&str> = remaining.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"Still pending"));
    assert!(titles.contains(&"Fresh"));

    assert_eq!(
        app.state.jobs.notifications_purged.load(Ordering::Relaxed),
        1
    );
    assert_eq!(app.state.jobs.sessions_purged.load(Ordering::Relaxed), 1);
}
