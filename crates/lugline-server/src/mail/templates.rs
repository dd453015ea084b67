// SPDX-License-Identifier: Apache-2.0

//! Email bodies for delivery lifecycle events.

use lugline_model::{Delivery, DeliveryStatus, User};

use super::Email;

/// One-line customer-facing description of a status change. Shared with the
/// stored notifications and the status emails.
pub(crate) fn status_message(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Pending => "Your delivery request has been received",
        DeliveryStatus::Assigned => "A driver has been assigned to your delivery",
        DeliveryStatus::PickedUp => "Your items have been picked up",
        DeliveryStatus::InTransit => "Your delivery is in transit",
        DeliveryStatus::Delivered => "Your delivery has been completed",
        DeliveryStatus::Cancelled => "Your delivery has been cancelled",
    }
}

pub(crate) fn delivery_created(to: &str, delivery: &Delivery) -> Email {
    Email {
        to: to.to_string(),
        subject: "Delivery Request Created - Lugline".to_string(),
        html: format!(
            "<h2>Delivery Request Created</h2>\
             <p>Your delivery request <strong>{}</strong> has been created.</p>\
             <p>Pickup: {}</p>\
             <p>Drop-off: {}</p>\
             <p>Fee: ${:.2}</p>\
             <p>We will let you know as soon as a driver accepts it.</p>",
            delivery.id,
            delivery.pickup_location.address,
            delivery.drop_location.address,
            delivery.delivery_fee,
        ),
    }
}

pub(crate) fn driver_assigned(to: &str, delivery: &Delivery, driver: &User) -> Email {
    let vehicle = vehicle_line(driver);
    Email {
        to: to.to_string(),
        subject: "Driver Assigned - Lugline".to_string(),
        html: format!(
            "<h2>Driver Assigned</h2>\
             <p>{} is handling your delivery <strong>{}</strong>.</p>\
             {}\
             <p>Pickup: {}</p>\
             <p>Drop-off: {}</p>",
            driver.name,
            delivery.id,
            vehicle,
            delivery.pickup_location.address,
            delivery.drop_location.address,
        ),
    }
}

pub(crate) fn new_assignment(to: &str, delivery: &Delivery) -> Email {
    Email {
        to: to.to_string(),
        subject: "New Delivery Assignment - Lugline".to_string(),
        html: format!(
            "<h2>New Delivery Assignment</h2>\
             <p>You have been assigned delivery <strong>{}</strong>.</p>\
             <p>Pickup: {}</p>\
             <p>Drop-off: {}</p>\
             <p>Fee: ${:.2}</p>",
            delivery.id,
            delivery.pickup_location.address,
            delivery.drop_location.address,
            delivery.delivery_fee,
        ),
    }
}

pub(crate) fn status_update(to: &str, delivery: &Delivery, status: DeliveryStatus) -> Email {
    Email {
        to: to.to_string(),
        subject: format!(
            "Delivery Update - {}",
            status.as_str().replace('_', " ").to_uppercase()
        ),
        html: format!(
            "<h2>Delivery Update</h2>\
             <p>{}</p>\
             <p>Delivery: <strong>{}</strong></p>",
            status_message(status),
            delivery.id,
        ),
    }
}

pub(crate) fn delivery_completed(to: &str, delivery: &Delivery) -> Email {
    Email {
        to: to.to_string(),
        subject: "Delivery Completed - Lugline".to_string(),
        html: format!(
            "<h2>Delivery Completed</h2>\
             <p>Your delivery <strong>{}</strong> was delivered successfully.</p>\
             <p>Fee: ${:.2}</p>\
             <p>Thank you for using Lugline.</p>",
            delivery.id, delivery.delivery_fee,
        ),
    }
}

pub(crate) fn escalation(to: &str, delivery: &Delivery) -> Email {
    Email {
        to: to.to_string(),
        subject: "URGENT: Delivery Assignment Needed".to_string(),
        html: format!(
            "<h2>Urgent: Delivery Assignment Needed</h2>\
             <p>Delivery <strong>{}</strong> has no driver past the assignment cutoff.</p>\
             <p>Pickup: {}</p>\
             <p>Drop-off: {}</p>\
             <p>Please assign a driver manually.</p>",
            delivery.id,
            delivery.pickup_location.address,
            delivery.drop_location.address,
        ),
    }
}

fn vehicle_line(driver: &User) -> String {
    let Some(profile) = &driver.driver_profile else {
        return String::new();
    };
    match (&profile.vehicle_type, &profile.vehicle_number) {
        (Some(kind), Some(number)) => format!("<p>Vehicle: {} ({})</p>", kind.as_str(), number),
        (Some(kind), None) => format!("<p>Vehicle: {}</p>", kind.as_str()),
        (None, Some(number)) => format!("<p>Vehicle: {}</p>", number),
        (None, None) => String::new(),
    }
}
