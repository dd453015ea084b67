// SPDX-License-Identifier: Apache-2.0

//! Keyword-triggered navigation hints and canned suggestion lists.

use lugline_model::Role;
use serde_json::{json, Value};

// First match wins, so the more specific commands come first.
const NAVIGATION_COMMANDS: &[(&str, &str)] = &[
    ("book delivery", "/dashboard/new-delivery"),
    ("new delivery", "/dashboard/new-delivery"),
    ("track deliveries", "/dashboard/deliveries"),
    ("my deliveries", "/dashboard/deliveries"),
    ("available deliveries", "/dashboard/available"),
    ("dashboard", "/dashboard"),
];

/// Scans the user's message for a known command and returns the UI action.
pub(crate) fn suggested_action(message: &str) -> Option<Value> {
    let lowered = message.to_lowercase();
    for (command, path) in NAVIGATION_COMMANDS {
        if lowered.contains(command) {
            return Some(json!({"action": "navigate", "path": path}));
        }
    }
    if lowered.contains("logout") {
        return Some(json!({"action": "logout"}));
    }
    None
}

/// Canned prompts shown under the chat box, per page context and role.
pub(crate) fn suggestions_for(context: &str, role: Role) -> Vec<&'static str> {
    match context {
        "dashboard" => match role {
            Role::Customer => vec![
                "Book a new delivery",
                "Track my current deliveries",
                "View delivery history",
                "Update my profile",
            ],
            Role::Driver => vec![
                "Show available deliveries",
                "My current assignments",
                "Update my location",
                "View earnings",
            ],
            Role::Admin => vec![
                "Show dashboard overview",
                "Assign pending deliveries",
                "View all users",
                "System statistics",
            ],
        },
        "delivery" => vec![
            "What's my delivery status?",
            "Track delivery location",
            "Contact the driver",
            "Delivery instructions",
        ],
        _ => vec![
            "How can I help you?",
            "Navigate to dashboard",
            "Check notifications",
            "Account settings",
        ],
    }
}
