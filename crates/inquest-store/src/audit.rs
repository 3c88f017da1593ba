//! Append and list operations for [`AuditRecord`] rows.
//!
//! Records are written inside the transition transaction and never updated.
//! The table carries no foreign key so the trail survives request deletion.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::convert;
use crate::database::Database;
use crate::error::Result;
use crate::models::AuditRecord;

/// Insert one audit record on the caller's connection (usually a
/// transaction).  Statuses are raw strings, not parsed enum members, so a
/// force-set away from an unrecognized value is recorded faithfully.
pub(crate) fn insert_audit_tx(
    conn: &Connection,
    actor_id: Uuid,
    action: &str,
    request_id: Uuid,
    from_status: &str,
    to_status: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO audit_log (id, actor_id, action, request_id, from_status, to_status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            Uuid::new_v4().to_string(),
            actor_id.to_string(),
            action,
            request_id.to_string(),
            from_status,
            to_status,
            at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Database {
    /// List a request's audit trail oldest-first.
    pub fn list_audit_records(&self, request_id: Uuid) -> Result<Vec<AuditRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, actor_id, action, request_id, from_status, to_status, created_at
             FROM audit_log
             WHERE request_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![request_id.to_string()], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to an [`AuditRecord`].
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        id: convert::uuid_col(row, 0)?,
        actor_id: convert::uuid_col(row, 1)?,
        action: row.get(2)?,
        request_id: convert::uuid_col(row, 3)?,
        from_status: row.get(4)?,
        to_status: row.get(5)?,
        created_at: convert::ts_col(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::insert_audit_tx;
    use crate::testutil;

    #[test]
    fn records_list_in_write_order() {
        let (_dir, db) = testutil::open_test_db();
        let request_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let now = Utc::now();

        insert_audit_tx(db.conn(), actor, "status.change", request_id, "MATCHING", "ACCEPTED", now)
            .unwrap();
        insert_audit_tx(
            db.conn(),
            actor,
            "status.change",
            request_id,
            "ACCEPTED",
            "IN_PROGRESS",
            now,
        )
        .unwrap();

        let trail = db.list_audit_records(request_id).unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].from_status, "MATCHING");
        assert_eq!(trail[1].to_status, "IN_PROGRESS");
        // Unrelated requests see nothing.
        assert!(db.list_audit_records(Uuid::new_v4()).unwrap().is_empty());
    }
}
