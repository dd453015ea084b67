// SPDX-License-Identifier: Apache-2.0

use crate::delivery::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Delivery,
    System,
    Payment,
    Rating,
}

impl NotificationKind {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "delivery" => Ok(Self::Delivery),
            "system" => Ok(Self::System),
            "payment" => Ok(Self::Payment),
            "rating" => Ok(Self::Rating),
            other => Err(ValidationError(format!(
                "unknown notification kind: {other}"
            ))),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::System => "system",
            Self::Payment => "payment",
            Self::Rating => "rating",
        }
    }
}

/// A stored bell-dropdown notification. Socket events are fire-and-forget;
/// these persist until the cleanup job reaps read ones past retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    #[must_use]
    pub fn new(
        recipient_id: &str,
        title: &str,
        message: &str,
        kind: NotificationKind,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_id: recipient_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind,
            priority: None,
            data,
            is_read: false,
            created_at: now,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: &str) -> Self {
        self.priority = Some(priority.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_round_trips() {
        for kind in [
            NotificationKind::Delivery,
            NotificationKind::System,
            NotificationKind::Payment,
            NotificationKind::Rating,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(NotificationKind::parse("broadcast").is_err());
    }

    #[test]
    fn new_notification_starts_unread() {
        let n = Notification::new(
            "admin-1",
            "Urgent: No Drivers Available",
            "Delivery d-1 has been pending for 24+ hours",
            NotificationKind::System,
            json!({ "deliveryId": "d-1", "actionRequired": true }),
            Utc::now(),
        )
        .with_priority("high");
        assert!(!n.is_read);
        assert_eq!(n.priority.as_deref(), Some("high"));
        assert_eq!(n.data["deliveryId"], "d-1");
    }
}
