// SPDX-License-Identifier: Apache-2.0

//! Websocket endpoint: session-token handshake, delivery rooms, location fan-out.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use lugline_api::errors::ApiError;
use lugline_model::{DriverLocation, Role, User};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::http::api_error_response;
use crate::realtime::{Scope, EVENT_DRIVER_LOCATION};
use crate::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Messages a client may send over the socket. Anything else is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinDelivery { delivery_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveDelivery { delivery_id: String },
    #[serde(rename_all = "camelCase")]
    DriverLocationUpdate {
        delivery_id: String,
        location: LocationPayload,
    },
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    address: String,
}

/// `GET /ws?token=` authenticates the session token before upgrading.
pub(crate) async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = match params.get("token").filter(|t| !t.is_empty()) {
        Some(token) => token.clone(),
        None => return api_error_response(&ApiError::unauthorized("Authentication required")),
    };
    let user = match state.store.find_session_user(&token, Utc::now()).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return api_error_response(&ApiError::unauthorized("Invalid or expired session"))
        }
        Err(err) => {
            tracing::error!(error = %err, "session lookup failed during websocket upgrade");
            return api_error_response(&ApiError::internal("Internal server error"));
        }
    };
    if !user.is_active {
        return api_error_response(&ApiError::forbidden("Account is deactivated"));
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let connections = state.hub.connection_opened();
    tracing::info!(user_id = %user.id, connections, "websocket connected");

    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.hub.subscribe();
    let rooms: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let user_id = user.id.clone();
    let is_admin = user.role == Role::Admin;
    let is_driver = user.role == Role::Driver;

    let send_rooms = Arc::clone(&rooms);
    let send_user_id = user_id.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Ok(envelope) => {
                            let joined = joined_room(&send_rooms, &envelope.scope);
                            if !wants(&envelope.scope, &send_user_id, is_admin, joined) {
                                continue;
                            }
                            let frame = json!({"event": envelope.event, "data": envelope.data});
                            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "websocket subscriber lagged, dropping events");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_rooms = Arc::clone(&rooms);
    let recv_state = state.clone();
    let recv_user_id = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Text(text) = message {
                handle_client_message(&recv_state, &recv_user_id, is_driver, &recv_rooms, &text)
                    .await;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let connections = state.hub.connection_closed();
    tracing::info!(user_id = %user_id, connections, "websocket disconnected");
}

/// Room membership is checked outside the select arm so the lock never spans an await.
fn joined_room(rooms: &Mutex<HashSet<String>>, scope: &Scope) -> bool {
    match scope {
        Scope::Delivery(id) => rooms
            .lock()
            .map(|set| set.contains(id))
            .unwrap_or(false),
        _ => false,
    }
}

fn wants(scope: &Scope, user_id: &str, is_admin: bool, joined: bool) -> bool {
    match scope {
        Scope::Broadcast => true,
        Scope::User(id) => id == user_id,
        Scope::Admins => is_admin,
        Scope::Delivery(_) => joined,
    }
}

async fn handle_client_message(
    state: &AppState,
    user_id: &str,
    is_driver: bool,
    rooms: &Mutex<HashSet<String>>,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(_) => return,
    };
    match message {
        ClientMessage::JoinDelivery { delivery_id } => {
            if let Ok(mut set) = rooms.lock() {
                set.insert(delivery_id);
            }
        }
        ClientMessage::LeaveDelivery { delivery_id } => {
            if let Ok(mut set) = rooms.lock() {
                set.remove(&delivery_id);
            }
        }
        ClientMessage::DriverLocationUpdate {
            delivery_id,
            location,
        } => {
            if !is_driver {
                return;
            }
            let now = Utc::now();
            let stored = DriverLocation {
                latitude: location.latitude,
                longitude: location.longitude,
                address: location.address.clone(),
                last_updated: now,
            };
            if let Err(err) = state
                .store
                .set_driver_location(user_id, stored, now)
                .await
            {
                tracing::warn!(error = %err, driver_id = %user_id, "failed to persist driver location");
            }
            state.hub.to_delivery(
                &delivery_id,
                EVENT_DRIVER_LOCATION,
                json!({
                    "driverId": user_id,
                    "location": {
                        "latitude": location.latitude,
                        "longitude": location.longitude,
                        "address": location.address,
                    },
                    "timestamp": now,
                }),
            );
        }
    }
}
