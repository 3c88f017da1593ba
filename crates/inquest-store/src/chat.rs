//! Operations for [`ChatRoom`] and [`ChatMessage`] records.
//!
//! A case request has at most one room, enforced by the UNIQUE constraint
//! on `chat_rooms.request_id`.  Room creation is an atomic get-or-create:
//! INSERT .. ON CONFLICT DO NOTHING followed by a SELECT, never a
//! check-then-insert that could race.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::convert;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{ChatAttachment, ChatMessage, ChatRoom};

/// Room previews keep at most this many characters of the latest message.
pub const CHAT_PREVIEW_CAP: usize = 120;

/// Reads return at most this many messages, oldest first.
pub const CHAT_READ_CAP: u32 = 100;

/// A chat message about to be appended.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    /// The room the message belongs to.
    pub room_id: Uuid,
    /// Who sent it.
    pub sender_id: Uuid,
    /// Message text.
    pub content: String,
    /// Attached file references.
    pub attachments: Vec<ChatAttachment>,
}

impl Database {
    /// Fetch the room for a case request, creating it if absent.  Safe to
    /// call concurrently; every caller sees the same single row.
    pub fn get_or_create_chat_room(
        &self,
        request_id: Uuid,
        customer_id: Uuid,
        provider_user_id: Uuid,
    ) -> Result<ChatRoom> {
        self.conn().execute(
            "INSERT INTO chat_rooms (id, request_id, customer_id, provider_user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(request_id) DO NOTHING",
            params![
                Uuid::new_v4().to_string(),
                request_id.to_string(),
                customer_id.to_string(),
                provider_user_id.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        self.conn()
            .query_row(
                "SELECT id, request_id, customer_id, provider_user_id, last_message, last_message_at, created_at
                 FROM chat_rooms
                 WHERE request_id = ?1",
                params![request_id.to_string()],
                row_to_room,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Append a message and refresh the room's preview and last-message
    /// timestamp in the same transaction.
    pub fn append_chat_message(&mut self, new: &NewChatMessage) -> Result<ChatMessage> {
        let now = Utc::now();
        let preview: String = new.content.chars().take(CHAT_PREVIEW_CAP).collect();
        let attachments_json = if new.attachments.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&new.attachments)?)
        };

        let tx = self.conn_mut().transaction()?;

        let touched = tx.execute(
            "UPDATE chat_rooms SET last_message = ?2, last_message_at = ?3 WHERE id = ?1",
            params![new.room_id.to_string(), preview, now.to_rfc3339()],
        )?;
        if touched == 0 {
            return Err(StoreError::NotFound);
        }

        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO chat_messages (id, room_id, sender_id, content, attachments, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                new.room_id.to_string(),
                new.sender_id.to_string(),
                new.content,
                attachments_json,
                now.to_rfc3339(),
            ],
        )?;

        tx.commit()?;

        Ok(ChatMessage {
            id,
            room_id: new.room_id,
            sender_id: new.sender_id,
            content: new.content.clone(),
            attachments: new.attachments.clone(),
            created_at: now,
        })
    }

    /// List the most recent messages in a room, presented oldest-first,
    /// capped at [`CHAT_READ_CAP`].
    pub fn list_chat_messages(&self, room_id: Uuid) -> Result<Vec<ChatMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, room_id, sender_id, content, attachments, created_at
             FROM chat_messages
             WHERE room_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![room_id.to_string(), CHAT_READ_CAP], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        // Newest-first out of the query; flip for presentation.
        messages.reverse();
        Ok(messages)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`ChatRoom`].
fn row_to_room(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRoom> {
    Ok(ChatRoom {
        id: convert::uuid_col(row, 0)?,
        request_id: convert::uuid_col(row, 1)?,
        customer_id: convert::uuid_col(row, 2)?,
        provider_user_id: convert::uuid_col(row, 3)?,
        last_message: row.get(4)?,
        last_message_at: convert::opt_ts_col(row, 5)?,
        created_at: convert::ts_col(row, 6)?,
    })
}

/// Map a `rusqlite::Row` to a [`ChatMessage`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: convert::uuid_col(row, 0)?,
        room_id: convert::uuid_col(row, 1)?,
        sender_id: convert::uuid_col(row, 2)?,
        content: row.get(3)?,
        attachments: convert::json_vec_col(row, 4)?,
        created_at: convert::ts_col(row, 5)?,
    })
}
