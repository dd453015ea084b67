// SPDX-License-Identifier: Apache-2.0

use crate::delivery::Priority;
use crate::geo::round2;

/// Flat component of every fee, in dollars.
pub const BASE_FEE: f64 = 5.0;
/// Dollars per kilometer.
pub const PER_KM_FEE: f64 = 0.5;

/// `(base + per_km * distance) * priority multiplier`, rounded to cents.
#[must_use]
pub fn delivery_fee(distance_km: f64, priority: Priority) -> f64 {
    round2((BASE_FEE + PER_KM_FEE * distance_km) * priority.fee_multiplier())
}
