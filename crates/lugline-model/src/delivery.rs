// SPDX-License-Identifier: Apache-2.0

use crate::fee::delivery_fee;
use crate::geo::{estimated_minutes, haversine_km, GeoPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Delivery lifecycle. The happy path is strictly linear; `cancelled` is only
/// reachable before pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "picked_up" => Ok(Self::PickedUp),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ValidationError(format!("unknown delivery status: {other}"))),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Assigned, PickedUp)
                | (PickedUp, InTransit)
                | (InTransit, Delivered)
                | (Pending, Cancelled)
                | (Assigned, Cancelled)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Statuses in which a driver is actively working the delivery.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Assigned | Self::PickedUp | Self::InTransit)
    }

    /// Human wording used in customer status emails.
    #[must_use]
    pub fn customer_message(&self) -> &'static str {
        match self {
            Self::Pending => "Your delivery request is pending",
            Self::Assigned => "A driver has been assigned to your delivery",
            Self::PickedUp => "Your items have been picked up",
            Self::InTransit => "Your delivery is in transit",
            Self::Delivered => "Your delivery has been completed",
            Self::Cancelled => "Your delivery has been cancelled",
        }
    }
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(ValidationError(format!("unknown priority: {other}"))),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Sort rank, higher is more urgent. Persisted next to the priority so
    /// "urgent first" is a plain ORDER BY.
    #[must_use]
    pub fn rank(&self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }

    #[must_use]
    pub fn fee_multiplier(&self) -> f64 {
        match self {
            Self::High => 1.5,
            Self::Urgent => 2.0,
            _ => 1.0,
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "refunded" => Ok(Self::Refunded),
            other => Err(ValidationError(format!("unknown payment status: {other}"))),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }
}

/// One endpoint of a delivery: a street address plus coordinates and optional
/// contact details for whoever is at that end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Location {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl Location {
    #[must_use]
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if self.address.trim().is_empty() {
            return Err(ValidationError(format!("{field} address is required")));
        }
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(ValidationError(format!(
                "{field} coordinates must be finite numbers"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDimensions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeliveryItem {
    pub description: String,
    /// Kilograms.
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ItemDimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default)]
    pub fragile: bool,
}

impl DeliveryItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError("item description is required".to_string()));
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(ValidationError(
                "item weight must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackingPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrackingEntry {
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<TrackingPoint>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeliveryRating {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_feedback: Option<String>,
}

/// The central document: one pickup→drop request, its items, lifecycle state,
/// and money. Consistency is last-write-wins on the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub pickup_location: Location,
    pub drop_location: Location,
    pub items: Vec<DeliveryItem>,
    pub status: DeliveryStatus,
    pub priority: Priority,
    pub scheduled_pickup: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_pickup_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub delivery_fee: f64,
    /// Kilometers, Haversine pickup→drop, rounded to 2 decimals.
    pub distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
    pub tracking: Vec<TrackingEntry>,
    #[serde(default)]
    pub rating: DeliveryRating,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_assigned_at: Option<DateTime<Utc>>,
    pub is_urgent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Builds a new request. Distance, fee, and ETA are always derived
    /// server-side from the submitted endpoints; the tracking history starts
    /// with the pending entry.
    pub fn create(
        customer_id: &str,
        pickup_location: Location,
        drop_location: Location,
        items: Vec<DeliveryItem>,
        priority: Priority,
        scheduled_pickup: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        pickup_location.validate("pickup")?;
        drop_location.validate("drop")?;
        if items.is_empty() {
            return Err(ValidationError("at least one item is required".to_string()));
        }
        for item in &items {
            item.validate()?;
        }

        let distance = haversine_km(pickup_location.point(), drop_location.point());
        let estimated_duration = estimated_minutes(distance);
        let mut delivery = Self {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            driver_id: None,
            pickup_location,
            drop_location,
            items,
            status: DeliveryStatus::Pending,
            priority,
            scheduled_pickup: scheduled_pickup.unwrap_or(now),
            estimated_delivery: None,
            actual_pickup_time: None,
            actual_delivery_time: None,
            delivery_fee: delivery_fee(distance, priority),
            distance,
            estimated_duration: Some(estimated_duration),
            tracking: Vec::new(),
            rating: DeliveryRating::default(),
            payment_status: PaymentStatus::default(),
            auto_assigned_at: None,
            is_urgent: false,
            created_at: now,
            updated_at: now,
        };
        delivery.push_tracking(DeliveryStatus::Pending, Some("Delivery request created"), now);
        Ok(delivery)
    }

    pub fn push_tracking(
        &mut self,
        status: DeliveryStatus,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) {
        self.tracking.push(TrackingEntry {
            status,
            location: None,
            timestamp: now,
            notes: notes.map(str::to_string),
        });
        self.updated_at = now;
    }

    /// Hands the delivery to a driver. `note` records who did it ("Accepted by
    /// driver ...", "Assigned by admin", "Auto-assigned by system").
    pub fn assign_to(
        &mut self,
        driver_id: &str,
        note: &str,
        auto_assigned: bool,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if self.status != DeliveryStatus::Pending || self.driver_id.is_some() {
            return Err(ValidationError("delivery is no longer assignable".to_string()));
        }
        self.driver_id = Some(driver_id.to_string());
        self.status = DeliveryStatus::Assigned;
        if auto_assigned {
            self.auto_assigned_at = Some(now);
        }
        self.push_tracking(DeliveryStatus::Assigned, Some(note), now);
        Ok(())
    }

    /// Applies a lifecycle transition and its timestamp side effects.
    pub fn transition_to(
        &mut self,
        next: DeliveryStatus,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError(format!(
                "cannot move delivery from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        match next {
            DeliveryStatus::PickedUp => self.actual_pickup_time = Some(now),
            DeliveryStatus::Delivered => self.actual_delivery_time = Some(now),
            _ => {}
        }
        self.push_tracking(next, notes, now);
        Ok(())
    }

    /// The no-drivers branch of the auto-assignment sweep: force urgency and
    /// reprice so the stored fee matches the stored priority.
    pub fn escalate_to_urgent(&mut self, now: DateTime<Utc>) {
        self.is_urgent = true;
        self.priority = Priority::Urgent;
        self.recompute_fee();
        self.updated_at = now;
    }

    pub fn recompute_fee(&mut self) {
        self.delivery_fee = delivery_fee(self.distance, self.priority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(lat: f64, lon: f64) -> Location {
        Location {
            address: "somewhere".to_string(),
            latitude: lat,
            longitude: lon,
            contact_name: None,
            contact_phone: None,
            instructions: None,
        }
    }

    fn item() -> DeliveryItem {
        DeliveryItem {
            description: "suitcase".to_string(),
            weight: 12.0,
            dimensions: None,
            value: None,
            fragile: false,
        }
    }

    fn sample() -> Delivery {
        Delivery::create(
            "cust-1",
            loc(52.52, 13.405),
            loc(52.5, 13.39),
            vec![item()],
            Priority::Medium,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn lifecycle_is_linear() {
        use DeliveryStatus::*;
        assert!(Pending.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(PickedUp));
        assert!(PickedUp.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!InTransit.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Assigned.can_transition_to(Cancelled));
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn create_derives_distance_fee_and_eta() {
        let delivery = sample();
        assert!(delivery.distance > 0.0);
        assert!(delivery.delivery_fee >= 5.0);
        assert!(delivery.estimated_duration.unwrap() > 0);
        assert_eq!(delivery.status, DeliveryStatus::Pending);
        assert_eq!(delivery.tracking.len(), 1);
        assert_eq!(delivery.tracking[0].status, DeliveryStatus::Pending);
    }

    #[test]
    fn create_rejects_empty_items() {
        let err = Delivery::create(
            "c",
            loc(0.0, 0.0),
            loc(1.0, 1.0),
            vec![],
            Priority::Medium,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.0.contains("at least one item"));
    }

    #[test]
    fn create_rejects_bad_item_weight() {
        let mut bad = item();
        bad.weight = 0.0;
        let err = Delivery::create(
            "c",
            loc(0.0, 0.0),
            loc(1.0, 1.0),
            vec![bad],
            Priority::Medium,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.0.contains("weight"));
    }

    #[test]
    fn assign_moves_pending_to_assigned() {
        let mut delivery = sample();
        let now = Utc::now();
        delivery
            .assign_to("drv-1", "Accepted by driver Dana", false, now)
            .unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Assigned);
        assert_eq!(delivery.driver_id.as_deref(), Some("drv-1"));
        assert!(delivery.auto_assigned_at.is_none());
        assert_eq!(delivery.tracking.len(), 2);
    }

    #[test]
    fn auto_assign_stamps_timestamp() {
        let mut delivery = sample();
        let now = Utc::now();
        delivery
            .assign_to("drv-1", "Auto-assigned by system", true, now)
            .unwrap();
        assert_eq!(delivery.auto_assigned_at, Some(now));
    }

    #[test]
    fn double_assign_is_rejected() {
        let mut delivery = sample();
        delivery.assign_to("drv-1", "x", false, Utc::now()).unwrap();
        assert!(delivery.assign_to("drv-2", "y", false, Utc::now()).is_err());
    }

    #[test]
    fn transition_stamps_times() {
        let mut delivery = sample();
        let now = Utc::now();
        delivery.assign_to("drv-1", "x", false, now).unwrap();
        delivery
            .transition_to(DeliveryStatus::PickedUp, None, now)
            .unwrap();
        assert_eq!(delivery.actual_pickup_time, Some(now));
        delivery
            .transition_to(DeliveryStatus::InTransit, None, now)
            .unwrap();
        delivery
            .transition_to(DeliveryStatus::Delivered, None, now)
            .unwrap();
        assert_eq!(delivery.actual_delivery_time, Some(now));
        assert_eq!(delivery.tracking.len(), 5);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let mut delivery = sample();
        let err = delivery
            .transition_to(DeliveryStatus::Delivered, None, Utc::now())
            .unwrap_err();
        assert!(err.0.contains("cannot move delivery"));
    }

    #[test]
    fn escalation_reprices() {
        let mut delivery = sample();
        let before = delivery.delivery_fee;
        delivery.escalate_to_urgent(Utc::now());
        assert!(delivery.is_urgent);
        assert_eq!(delivery.priority, Priority::Urgent);
        assert!(delivery.delivery_fee > before);
    }

    #[test]
    fn delivery_json_is_camel_case() {
        let delivery = sample();
        let json = serde_json::to_value(&delivery).unwrap();
        assert!(json.get("pickupLocation").is_some());
        assert!(json.get("dropLocation").is_some());
        assert!(json.get("deliveryFee").is_some());
        assert!(json.get("isUrgent").is_some());
        assert_eq!(json["status"], "pending");
    }
}
