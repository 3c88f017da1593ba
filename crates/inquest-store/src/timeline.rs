//! Append and list operations for [`TimelineEntry`] records.
//!
//! The timeline is append-only: nothing here updates or deletes an entry.
//! Lifecycle entries (creation, transitions) are written through
//! [`insert_entry_tx`] inside the owning transaction; the manual append is
//! its own transaction that also refreshes the parent request.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use inquest_shared::TimelineKind;

use crate::convert;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::TimelineEntry;

/// Reads return at most this many entries, oldest first.
pub const TIMELINE_READ_CAP: u32 = 1000;

/// A timeline entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewTimelineEntry {
    /// The case request the entry belongs to.
    pub request_id: Uuid,
    /// What happened.
    pub kind: TimelineKind,
    /// Optional short headline.
    pub title: Option<String>,
    /// Optional free-text body.
    pub note: Option<String>,
    /// Optional structured payload matching the kind's schema.
    pub payload: Option<serde_json::Value>,
    /// Who wrote the entry.
    pub author_id: Uuid,
}

/// Insert one entry on the caller's connection (usually a transaction).
pub(crate) fn insert_entry_tx(
    conn: &Connection,
    new: &NewTimelineEntry,
    at: DateTime<Utc>,
) -> Result<TimelineEntry> {
    let id = Uuid::new_v4();
    let payload_json = new
        .payload
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO timeline_entries (id, request_id, kind, title, note, payload, author_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id.to_string(),
            new.request_id.to_string(),
            new.kind.to_string(),
            new.title,
            new.note,
            payload_json,
            new.author_id.to_string(),
            at.to_rfc3339(),
        ],
    )?;

    Ok(TimelineEntry {
        id,
        request_id: new.request_id,
        kind: new.kind,
        title: new.title.clone(),
        note: new.note.clone(),
        payload: new.payload.clone(),
        author_id: new.author_id,
        created_at: at,
    })
}

impl Database {
    /// Append a manual entry and refresh the parent request's `updated_at`
    /// in the same transaction.
    pub fn append_timeline_entry(&mut self, new: &NewTimelineEntry) -> Result<TimelineEntry> {
        let now = Utc::now();
        let tx = self.conn_mut().transaction()?;

        let touched = tx.execute(
            "UPDATE case_requests SET updated_at = ?2 WHERE id = ?1",
            params![new.request_id.to_string(), now.to_rfc3339()],
        )?;
        if touched == 0 {
            return Err(StoreError::NotFound);
        }

        let entry = insert_entry_tx(&tx, new, now)?;
        tx.commit()?;
        Ok(entry)
    }

    /// List a request's timeline oldest-first, capped at
    /// [`TIMELINE_READ_CAP`] entries.
    pub fn list_timeline_entries(&self, request_id: Uuid) -> Result<Vec<TimelineEntry>> {
        let mut stmt = self.conn().prepare(
            // rowid breaks ties between entries written in one transaction.
            "SELECT id, request_id, kind, title, note, payload, author_id, created_at
             FROM timeline_entries
             WHERE request_id = ?1
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(
            params![request_id.to_string(), TIMELINE_READ_CAP],
            row_to_entry,
        )?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`TimelineEntry`].
fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimelineEntry> {
    Ok(TimelineEntry {
        id: convert::uuid_col(row, 0)?,
        request_id: convert::uuid_col(row, 1)?,
        kind: convert::parsed_col(row, 2)?,
        title: row.get(3)?,
        note: row.get(4)?,
        payload: convert::opt_json_col(row, 5)?,
        author_id: convert::uuid_col(row, 6)?,
        created_at: convert::ts_col(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use inquest_shared::{Role, TimelineKind, TimelinePayload};
    use uuid::Uuid;

    use super::NewTimelineEntry;
    use crate::error::StoreError;
    use crate::models::ProviderStatus;
    use crate::testutil;

    fn note_entry(request_id: Uuid, author_id: Uuid, note: &str) -> NewTimelineEntry {
        NewTimelineEntry {
            request_id,
            kind: TimelineKind::ProgressNote,
            title: None,
            note: Some(note.to_string()),
            payload: None,
            author_id,
        }
    }

    #[test]
    fn append_and_list_oldest_first() {
        let (_dir, mut db) = testutil::open_test_db();
        let customer = testutil::seed_user(&db, Role::Customer, "Dana");
        let provider = testutil::seed_provider(&db, ProviderStatus::Approved);
        let request = testutil::seed_request(&mut db, customer.id, provider.id);

        db.append_timeline_entry(&note_entry(request.id, provider.user_id, "first"))
            .unwrap();
        db.append_timeline_entry(&note_entry(request.id, provider.user_id, "second"))
            .unwrap();

        let entries = db.list_timeline_entries(request.id).unwrap();
        // Creation wrote two lifecycle entries before ours.
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].kind, TimelineKind::RequestCreated);
        assert_eq!(entries[1].kind, TimelineKind::InvestigatorAssigned);
        assert_eq!(entries[2].note.as_deref(), Some("first"));
        assert_eq!(entries[3].note.as_deref(), Some("second"));
        for pair in entries.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[test]
    fn append_to_missing_request_is_not_found() {
        let (_dir, mut db) = testutil::open_test_db();
        let err = db
            .append_timeline_entry(&note_entry(Uuid::new_v4(), Uuid::new_v4(), "orphan"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn append_refreshes_parent_request() {
        let (_dir, mut db) = testutil::open_test_db();
        let customer = testutil::seed_user(&db, Role::Customer, "Dana");
        let provider = testutil::seed_provider(&db, ProviderStatus::Approved);
        let request = testutil::seed_request(&mut db, customer.id, provider.id);

        db.append_timeline_entry(&note_entry(request.id, customer.id, "ping"))
            .unwrap();

        let reread = db.get_case_request(request.id).unwrap();
        assert!(reread.updated_at >= request.updated_at);
    }

    #[test]
    fn structured_payload_round_trips() {
        let (_dir, mut db) = testutil::open_test_db();
        let customer = testutil::seed_user(&db, Role::Customer, "Dana");
        let provider = testutil::seed_provider(&db, ProviderStatus::Approved);
        let request = testutil::seed_request(&mut db, customer.id, provider.id);

        let payload = TimelinePayload::Attachment {
            file_name: "findings.pdf".into(),
            url: "blob://findings".into(),
        };
        db.append_timeline_entry(&NewTimelineEntry {
            request_id: request.id,
            kind: TimelineKind::AttachmentShared,
            title: Some("Findings".into()),
            note: None,
            payload: Some(serde_json::to_value(&payload).unwrap()),
            author_id: provider.user_id,
        })
        .unwrap();

        let entries = db.list_timeline_entries(request.id).unwrap();
        let stored = entries.last().unwrap();
        assert_eq!(stored.kind, TimelineKind::AttachmentShared);
        let back: TimelinePayload =
            serde_json::from_value(stored.payload.clone().unwrap()).unwrap();
        assert_eq!(back, payload);
    }
}
