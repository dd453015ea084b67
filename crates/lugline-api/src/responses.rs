use chrono::{DateTime, Utc};
use lugline_model::{Delivery, Notification, User, VehicleType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The slice of an account embedded in delivery payloads, mirroring what the
/// web client renders next to a delivery (never the full account).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl UserSummary {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        let profile = user.driver_profile.as_ref();
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            vehicle_type: profile.and_then(|p| p.vehicle_type),
            vehicle_number: profile.and_then(|p| p.vehicle_number.clone()),
            rating: profile.map(|p| p.rating),
        }
    }
}

/// A delivery with its customer/driver summaries joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryView {
    #[serde(flatten)]
    pub delivery: Delivery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub message: String,
    pub delivery: DeliveryView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryListResponse {
    pub deliveries: Vec<DeliveryView>,
    pub total_pages: usize,
    pub current_page: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total_pages: usize,
    pub current_page: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_drivers: usize,
    pub active_drivers: usize,
    pub total_deliveries: usize,
    pub pending_deliveries: usize,
    pub overdue_deliveries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub recent_deliveries: Vec<DeliveryView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStats {
    pub total_deliveries: u32,
    pub completed_deliveries: usize,
    pub active_deliveries: usize,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverStatsResponse {
    pub stats: DriverStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub response: String,
    pub suggested_action: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lugline_model::{DeliveryItem, Location, Priority, Role};

    fn delivery() -> Delivery {
        Delivery::create(
            "cust-1",
            Location {
                address: "a".into(),
                latitude: 0.0,
                longitude: 0.0,
                contact_name: None,
                contact_phone: None,
                instructions: None,
            },
            Location {
                address: "b".into(),
                latitude: 1.0,
                longitude: 1.0,
                contact_name: None,
                contact_phone: None,
                instructions: None,
            },
            vec![DeliveryItem {
                description: "bag".into(),
                weight: 2.0,
                dimensions: None,
                value: None,
                fragile: false,
            }],
            Priority::Medium,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn delivery_view_flattens_document() {
        let customer = User::new("Cleo", "c@example.com", Role::Customer, Utc::now());
        let view = DeliveryView {
            delivery: delivery(),
            customer: Some(UserSummary::from_user(&customer)),
            driver: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("pickupLocation").is_some(), "flattened fields");
        assert_eq!(json["customer"]["name"], "Cleo");
        assert!(json.get("driver").is_none());
    }

    #[test]
    fn driver_summary_carries_vehicle_fields() {
        let mut driver = User::new("Dana", "d@example.com", Role::Driver, Utc::now());
        if let Some(profile) = driver.driver_profile.as_mut() {
            profile.vehicle_type = Some(VehicleType::Van);
            profile.vehicle_number = Some("B-XY 123".into());
        }
        let summary = UserSummary::from_user(&driver);
        assert_eq!(summary.vehicle_type, Some(VehicleType::Van));
        assert_eq!(summary.rating, Some(5.0));
    }
}
