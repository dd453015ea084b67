#![forbid(unsafe_code)]
//! Lugline domain model.
//!
//! Pure types and arithmetic for the delivery marketplace: users and driver
//! profiles, the delivery document with its lifecycle, notifications, and the
//! fee/distance/ETA formulas. No I/O lives here.

mod delivery;
mod fee;
mod geo;
mod notification;
mod user;

pub use delivery::{
    Delivery, DeliveryItem, DeliveryRating, DeliveryStatus, ItemDimensions, Location,
    PaymentStatus, Priority, TrackingEntry, TrackingPoint, ValidationError,
};
pub use fee::{delivery_fee, BASE_FEE, PER_KM_FEE};
pub use geo::{estimated_minutes, haversine_km, route_waypoints, GeoPoint, AVERAGE_SPEED_KMH};
pub use notification::{Notification, NotificationKind};
pub use user::{DriverLocation, DriverProfile, Role, User, VehicleType};

pub const CRATE_NAME: &str = "lugline-model";
