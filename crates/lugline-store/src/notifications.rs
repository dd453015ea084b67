// SPDX-License-Identifier: Apache-2.0

use crate::error::{Result, StoreError};
use crate::{to_millis, Store};
use chrono::{DateTime, Utc};
use lugline_model::{Notification, NotificationKind};
use rusqlite::{params, Row};

struct RawNotification {
    id: String,
    recipient_id: String,
    title: String,
    message: String,
    kind: String,
    priority: Option<String>,
    data: String,
    is_read: bool,
    created_at: i64,
}

fn read_notification(row: &Row<'_>) -> rusqlite::Result<RawNotification> {
    Ok(RawNotification {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: row.get(4)?,
        priority: row.get(5)?,
        data: row.get(6)?,
        is_read: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl RawNotification {
    fn into_notification(self) -> Result<Notification> {
        let kind =
            NotificationKind::parse(&self.kind).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Notification {
            id: self.id,
            recipient_id: self.recipient_id,
            title: self.title,
            message: self.message,
            kind,
            priority: self.priority,
            data: serde_json::from_str(&self.data)?,
            is_read: self.is_read,
            created_at: crate::from_millis(self.created_at)?,
        })
    }
}

impl Store {
    pub async fn insert_notification(&self, notification: Notification) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO notifications (id, recipient_id, title, message, kind, priority,
                 data, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    notification.id,
                    notification.recipient_id,
                    notification.title,
                    notification.message,
                    notification.kind.as_str(),
                    notification.priority,
                    serde_json::to_string(&notification.data)?,
                    notification.is_read,
                    to_millis(notification.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Newest first for the bell dropdown.
    pub async fn list_notifications(
        &self,
        recipient_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let recipient_id = recipient_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recipient_id, title, message, kind, priority, data, is_read,
                 created_at
                 FROM notifications WHERE recipient_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let raws = stmt
                .query_map(params![recipient_id, limit as i64], read_notification)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            raws.into_iter()
                .map(RawNotification::into_notification)
                .collect()
        })
        .await
    }

    pub async fn count_unread_notifications(&self, recipient_id: &str) -> Result<usize> {
        let recipient_id = recipient_id.to_string();
        self.with_conn(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
                params![recipient_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
    }

    /// Marks one notification read; scoped to the recipient so one account
    /// cannot touch another's bell.
    pub async fn mark_notification_read(&self, id: &str, recipient_id: &str) -> Result<bool> {
        let id = id.to_string();
        let recipient_id = recipient_id.to_string();
        self.with_conn(move |conn| {
            let n = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
                params![id, recipient_id],
            )?;
            Ok(n > 0)
        })
        .await
    }

    pub async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<usize> {
        let recipient_id = recipient_id.to_string();
        self.with_conn(move |conn| {
            let n = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
                params![recipient_id],
            )?;
            Ok(n)
        })
        .await
    }

    /// Retention sweep: read notifications older than `cutoff` are dropped.
    pub async fn delete_read_notifications_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM notifications WHERE is_read = 1 AND created_at < ?1",
                params![to_millis(cutoff)],
            )?;
            Ok(n)
        })
        .await
    }
}
