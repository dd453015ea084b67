// SPDX-License-Identifier: Apache-2.0

use crate::delivery::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Driver,
    Admin,
}

impl Role {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "customer" => Ok(Self::Customer),
            "driver" => Ok(Self::Driver),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError(format!("unknown role: {other}"))),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Driver => "driver",
            Self::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Bike,
    Car,
    Van,
    Truck,
}

impl VehicleType {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "bike" => Ok(Self::Bike),
            "car" => Ok(Self::Car),
            "van" => Ok(Self::Van),
            "truck" => Ok(Self::Truck),
            other => Err(ValidationError(format!("unknown vehicle type: {other}"))),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bike => "bike",
            Self::Car => "car",
            Self::Van => "van",
            Self::Truck => "truck",
        }
    }
}

/// Last reported position of a driver, stamped server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DriverLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DriverProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<DriverLocation>,
    pub rating: f64,
    pub total_deliveries: u32,
}

impl Default for DriverProfile {
    fn default() -> Self {
        Self {
            vehicle_type: None,
            vehicle_number: None,
            license_number: None,
            is_available: true,
            current_location: None,
            rating: 5.0,
            total_deliveries: 0,
        }
    }
}

/// A platform account. The password hash is a storage concern and is never part
/// of this type, so a serialized `User` can always go straight to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub avatar: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_profile: Option<DriverProfile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a fresh account. Emails are stored lowercase; drivers get a
    /// default profile so availability and rating always have a value.
    #[must_use]
    pub fn new(name: &str, email: &str, role: Role, now: DateTime<Utc>) -> Self {
        let driver_profile = if role == Role::Driver {
            Some(DriverProfile::default())
        } else {
            None
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_ascii_lowercase(),
            role,
            phone: None,
            address: String::new(),
            avatar: String::new(),
            is_active: true,
            driver_profile,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_available_driver(&self) -> bool {
        self.role == Role::Driver
            && self.is_active
            && self
                .driver_profile
                .as_ref()
                .is_some_and(|p| p.is_available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::Customer, Role::Driver, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
        assert!(Role::parse("superuser").is_err());
    }

    #[test]
    fn new_driver_gets_default_profile() {
        let now = Utc::now();
        let user = User::new("Dana", "Dana@Example.COM", Role::Driver, now);
        assert_eq!(user.email, "dana@example.com");
        let profile = user.driver_profile.as_ref().unwrap();
        assert!(profile.is_available);
        assert_eq!(profile.rating, 5.0);
        assert_eq!(profile.total_deliveries, 0);
        assert!(user.is_available_driver());
    }

    #[test]
    fn new_customer_has_no_profile() {
        let user = User::new("Cleo", "cleo@example.com", Role::Customer, Utc::now());
        assert!(user.driver_profile.is_none());
        assert!(!user.is_available_driver());
    }

    #[test]
    fn inactive_driver_is_not_available() {
        let mut user = User::new("Dana", "d@example.com", Role::Driver, Utc::now());
        user.is_active = false;
        assert!(!user.is_available_driver());
    }

    #[test]
    fn user_json_is_camel_case() {
        let user = User::new("Dana", "d@example.com", Role::Driver, Utc::now());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("isActive").is_some());
        assert!(json.get("driverProfile").is_some());
        assert!(json.get("password").is_none());
    }
}
