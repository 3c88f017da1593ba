//! Insert and list operations for [`Notification`] records.
//!
//! This table is an outbox: the engine inserts after a primary operation
//! commits, and the external delivery system consumes the rows.  Nothing
//! here is ever required for an operation to succeed.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use inquest_shared::NotificationKind;

use crate::convert;
use crate::database::Database;
use crate::error::Result;
use crate::models::Notification;

/// A notification about to be written to the outbox.
#[derive(Debug, Clone)]
pub struct NewNotification {
    /// The user to notify.
    pub user_id: Uuid,
    /// What kind of event this announces.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Human-readable body.
    pub message: String,
    /// The case request the event concerns, if any.
    pub request_id: Option<Uuid>,
    /// Optional structured context for the delivery layer.
    pub metadata: Option<serde_json::Value>,
}

impl Database {
    /// Write one notification to the outbox.
    pub fn insert_notification(&self, new: &NewNotification) -> Result<Notification> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let metadata_json = new
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn().execute(
            "INSERT INTO notifications (id, user_id, kind, title, message, request_id, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                new.user_id.to_string(),
                new.kind.to_string(),
                new.title,
                new.message,
                new.request_id.map(|r| r.to_string()),
                metadata_json,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Notification {
            id,
            user_id: new.user_id,
            kind: new.kind,
            title: new.title.clone(),
            message: new.message.clone(),
            request_id: new.request_id,
            metadata: new.metadata.clone(),
            read_at: None,
            created_at: now,
        })
    }

    /// List a user's notifications, newest first.
    pub fn list_notifications_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, kind, title, message, request_id, metadata, read_at, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], row_to_notification)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Notification`].
fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: convert::uuid_col(row, 0)?,
        user_id: convert::uuid_col(row, 1)?,
        kind: convert::parsed_col(row, 2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        request_id: convert::opt_uuid_col(row, 5)?,
        metadata: convert::opt_json_col(row, 6)?,
        read_at: convert::opt_ts_col(row, 7)?,
        created_at: convert::ts_col(row, 8)?,
    })
}
