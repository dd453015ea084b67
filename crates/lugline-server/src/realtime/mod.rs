// SPDX-License-Identifier: Apache-2.0

//! Broadcast hub fanning server events out to connected websockets.
//!
//! Publishers push `(scope, event, payload)` envelopes onto one broadcast bus;
//! every connection subscribes and filters on its own user id, admin flag, and
//! joined delivery rooms. Events are fire-and-forget.

pub mod ws;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

pub const EVENT_NEW_DELIVERY: &str = "new_delivery";
pub const EVENT_DELIVERY_ASSIGNED: &str = "delivery_assigned";
pub const EVENT_NEW_ASSIGNMENT: &str = "new_assignment";
pub const EVENT_DELIVERY_STATUS_UPDATE: &str = "delivery_status_update";
pub const EVENT_DELIVERY_COMPLETED: &str = "delivery_completed";
pub const EVENT_DELIVERY_ESCALATION: &str = "delivery_escalation";
pub const EVENT_DRIVER_LOCATION: &str = "driver_location";

const HUB_CAPACITY: usize = 256;

/// Audience of a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    User(String),
    Delivery(String),
    Admins,
    Broadcast,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub scope: Scope,
    pub event: &'static str,
    pub data: Value,
}

#[derive(Clone)]
pub struct Hub {
    sender: broadcast::Sender<Envelope>,
    connections: Arc<AtomicU64>,
}

impl Hub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(HUB_CAPACITY);
        Self {
            sender,
            connections: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    pub fn publish(&self, scope: Scope, event: &'static str, data: Value) {
        // Send only fails when nobody is connected.
        let _ = self.sender.send(Envelope { scope, event, data });
    }

    pub fn to_user(&self, user_id: &str, event: &'static str, data: Value) {
        self.publish(Scope::User(user_id.to_string()), event, data);
    }

    pub fn to_admins(&self, event: &'static str, data: Value) {
        self.publish(Scope::Admins, event, data);
    }

    pub fn to_delivery(&self, delivery_id: &str, event: &'static str, data: Value) {
        self.publish(Scope::Delivery(delivery_id.to_string()), event, data);
    }

    pub fn broadcast(&self, event: &'static str, data: Value) {
        self.publish(Scope::Broadcast, event, data);
    }

    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub(crate) fn connection_opened(&self) -> u64 {
        self.connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn connection_closed(&self) -> u64 {
        self.connections
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
