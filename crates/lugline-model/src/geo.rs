// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// City-traffic average used for the delivery ETA.
pub const AVERAGE_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Great-circle distance in kilometers, rounded to 2 decimals.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    round2(EARTH_RADIUS_KM * c)
}

/// Whole minutes at [`AVERAGE_SPEED_KMH`], rounded up.
#[must_use]
pub fn estimated_minutes(distance_km: f64) -> u32 {
    let minutes = distance_km / AVERAGE_SPEED_KMH * 60.0;
    minutes.ceil() as u32
}

/// Mocked routing: the "route" is just the straight waypoint sequence, with
/// the driver's current position prepended when known.
#[must_use]
pub fn route_waypoints(pickup: GeoPoint, drop: GeoPoint, current: Option<GeoPoint>) -> Vec<GeoPoint> {
    let mut waypoints = Vec::with_capacity(3);
    if let Some(point) = current {
        waypoints.push(point);
    }
    waypoints.push(pickup);
    waypoints.push(drop);
    waypoints
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
