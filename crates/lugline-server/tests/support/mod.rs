// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

//! Shared wiring for the integration tests: a server on an ephemeral port
//! backed by a temp-file store, a recording mailer, and a scripted assistant.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lugline_model::{Delivery, DeliveryItem, Location, Priority};
use lugline_server::assistant::FakeAssistant;
use lugline_server::config::AppConfig;
use lugline_server::mail::FakeMailer;
use lugline_server::{build_router, AppState};
use lugline_store::Store;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub state: AppState,
    pub mailer: Arc<FakeMailer>,
    pub assistant: Arc<FakeAssistant>,
    _db_dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_configured(
        AppConfig::default(),
        FakeAssistant::with_reply("Happy to help with that."),
    )
    .await
}

pub async fn spawn_configured(mut config: AppConfig, assistant: FakeAssistant) -> TestApp {
    let db_dir = tempfile::tempdir().expect("tempdir");
    config.db_path = db_dir.path().join("lugline.sqlite3");
    let store = Store::open(&config.db_path).expect("open store");
    let mailer = Arc::new(FakeMailer::default());
    let assistant = Arc::new(assistant);
    let state = AppState::new(config, store, mailer.clone(), assistant.clone());
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve app")
    });

    TestApp {
        addr,
        client: reqwest::Client::new(),
        state,
        mailer,
        assistant,
        _db_dir: db_dir,
    }
}

/// One JSON request. The body comes back as `Value::Null` when empty.
pub async fn send(
    app: &TestApp,
    method: reqwest::Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let mut request = app.client.request(method, app.url(path));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.expect("send request");
    let status = response.status().as_u16();
    let text = response.text().await.expect("read body");
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).expect("json body")
    };
    (status, body)
}

/// Registers an account and returns its session token plus the user document.
pub async fn register_user(app: &TestApp, payload: Value) -> (String, Value) {
    let (status, body) = send(
        app,
        reqwest::Method::POST,
        "/api/auth/register",
        None,
        Some(payload),
    )
    .await;
    assert_eq!(status, 201, "register failed: {body}");
    let token = body["token"].as_str().expect("session token").to_string();
    (token, body["user"].clone())
}

pub fn customer_payload(email: &str) -> Value {
    json!({
        "name": "Casey Customer",
        "email": email,
        "password": "sekrit-pass-1",
        "phone": "555-0100"
    })
}

pub fn driver_payload(email: &str) -> Value {
    json!({
        "name": "Devon Driver",
        "email": email,
        "password": "sekrit-pass-2",
        "role": "driver",
        "driverInfo": {
            "vehicleType": "van",
            "vehicleNumber": "LUG-42",
            "licenseNumber": "DL-9912"
        }
    })
}

pub fn delivery_payload() -> Value {
    json!({
        "pickupLocation": {
            "address": "12 Harbor Rd, Dover",
            "latitude": 51.1279,
            "longitude": 1.3134,
            "contactName": "Front Desk"
        },
        "dropLocation": {
            "address": "3 Rue de la Gare, Calais",
            "latitude": 50.9513,
            "longitude": 1.8587
        },
        "items": [
            {"description": "Two suitcases", "weight": 23.5, "fragile": false}
        ]
    })
}

/// A pending, unassigned delivery created at `created_at`, for seeding the
/// store behind the sweep jobs.
pub fn backdated_delivery(customer_id: &str, created_at: DateTime<Utc>) -> Delivery {
    Delivery::create(
        customer_id,
        test_location("12 Harbor Rd, Dover", 51.1279, 1.3134),
        test_location("3 Rue de la Gare, Calais", 50.9513, 1.8587),
        vec![DeliveryItem {
            description: "Two suitcases".to_string(),
            weight: 23.5,
            dimensions: None,
            value: None,
            fragile: false,
        }],
        Priority::Medium,
        None,
        created_at,
    )
    .expect("delivery fixture")
}

fn test_location(address: &str, latitude: f64, longitude: f64) -> Location {
    Location {
        address: address.to_string(),
        latitude,
        longitude,
        contact_name: None,
        contact_phone: None,
        instructions: None,
    }
}

/// Opens a raw websocket handshake and returns the HTTP status line code plus
/// the still-open stream (dropping it closes the connection server-side).
pub async fn ws_handshake(addr: SocketAddr, path: &str) -> (u16, tokio::net::TcpStream) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n"
    );
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write handshake");

    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.expect("read handshake");
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let status = String::from_utf8_lossy(&head)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .expect("handshake status line");
    (status, stream)
}
