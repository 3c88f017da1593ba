//! CRUD and transition operations for [`CaseRequest`] records.
//!
//! The status column is only ever written through [`Database::apply_transition`],
//! which re-checks the stored status inside its transaction.  A concurrent
//! writer that loses the race gets [`StoreError::Conflict`], never a torn row.

use chrono::Utc;
use inquest_shared::{CaseStatus, TimelineKind};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::audit;
use crate::convert;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::CaseRequest;
use crate::reviews;
use crate::timeline::{self, NewTimelineEntry};

/// List reads return at most this many requests, newest first.
pub const REQUEST_LIST_CAP: u32 = 500;

const REQUEST_COLUMNS: &str = "id, title, details, desired_outcome, status, customer_id, \
     provider_id, scenario_id, budget_min, budget_max, decline_reason, created_at, \
     updated_at, accepted_at, declined_at, cancelled_at, completed_at";

/// A case request about to be created.
#[derive(Debug, Clone)]
pub struct NewCaseRequest {
    /// Short summary of the engagement.
    pub title: String,
    /// Full description of the work requested.
    pub details: String,
    /// What the customer hopes to get out of the engagement.
    pub desired_outcome: Option<String>,
    /// The customer opening the request.
    pub customer_id: Uuid,
    /// The provider the request is addressed to.
    pub provider_id: Uuid,
    /// Optional scenario template the request starts from.
    pub scenario_id: Option<Uuid>,
    /// Lower budget bound, minor currency units.
    pub budget_min: Option<i64>,
    /// Upper budget bound, minor currency units.
    pub budget_max: Option<i64>,
}

/// Partial field edits.  `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct FieldEdits {
    pub title: Option<String>,
    pub details: Option<String>,
    pub desired_outcome: Option<String>,
    pub scenario_id: Option<Uuid>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
}

impl FieldEdits {
    /// Whether the edit set changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.details.is_none()
            && self.desired_outcome.is_none()
            && self.scenario_id.is_none()
            && self.budget_min.is_none()
            && self.budget_max.is_none()
    }
}

/// Optional listing filters; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub customer_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<CaseStatus>,
}

/// The status the caller validated against, re-checked inside the
/// transition transaction.
#[derive(Debug, Clone)]
pub enum ExpectedStatus {
    /// A recognized status value.
    Is(CaseStatus),
    /// The raw stored string, for the admin repair path when the stored
    /// value is outside the recognized vocabulary.
    Raw(String),
}

impl ExpectedStatus {
    fn matches(&self, stored: &str) -> bool {
        match self {
            ExpectedStatus::Is(status) => stored == status.to_string(),
            ExpectedStatus::Raw(raw) => stored == raw,
        }
    }
}

/// A validated status change ready to be applied atomically: the new
/// status, the timeline entry recording it, and any field edits that ride
/// in the same transaction.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// The status being entered.
    pub to: CaseStatus,
    /// Decline reason; written with the `DECLINED` timestamp.
    pub decline_reason: Option<String>,
    /// Timeline entry kind recording this transition.
    pub entry_kind: TimelineKind,
    /// Optional timeline entry headline.
    pub entry_title: Option<String>,
    /// Optional timeline entry body.
    pub entry_note: Option<String>,
    /// Optional structured timeline payload.
    pub entry_payload: Option<serde_json::Value>,
    /// Who performed the transition.
    pub actor_id: Uuid,
    /// Field edits applied in the same transaction.
    pub edits: FieldEdits,
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new case request in its initial status together with its
    /// first two timeline entries, all in one transaction.
    pub fn create_case_request(&mut self, new: &NewCaseRequest) -> Result<CaseRequest> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT INTO case_requests
                 (id, title, details, desired_outcome, status, customer_id, provider_id,
                  scenario_id, budget_min, budget_max, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id.to_string(),
                new.title,
                new.details,
                new.desired_outcome,
                CaseStatus::Matching.to_string(),
                new.customer_id.to_string(),
                new.provider_id.to_string(),
                new.scenario_id.map(|s| s.to_string()),
                new.budget_min,
                new.budget_max,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        timeline::insert_entry_tx(
            &tx,
            &NewTimelineEntry {
                request_id: id,
                kind: TimelineKind::RequestCreated,
                title: Some("Case request submitted".into()),
                note: None,
                payload: None,
                author_id: new.customer_id,
            },
            now,
        )?;
        timeline::insert_entry_tx(
            &tx,
            &NewTimelineEntry {
                request_id: id,
                kind: TimelineKind::InvestigatorAssigned,
                title: Some("Investigator assigned".into()),
                note: None,
                payload: None,
                author_id: new.customer_id,
            },
            now,
        )?;

        tx.commit()?;

        Ok(CaseRequest {
            id,
            title: new.title.clone(),
            details: new.details.clone(),
            desired_outcome: new.desired_outcome.clone(),
            status: CaseStatus::Matching,
            customer_id: new.customer_id,
            provider_id: new.provider_id,
            scenario_id: new.scenario_id,
            budget_min: new.budget_min,
            budget_max: new.budget_max,
            decline_reason: None,
            created_at: now,
            updated_at: now,
            accepted_at: None,
            declined_at: None,
            cancelled_at: None,
            completed_at: None,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single case request by UUID.
    pub fn get_case_request(&self, id: Uuid) -> Result<CaseRequest> {
        self.conn()
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM case_requests WHERE id = ?1"),
                params![id.to_string()],
                row_to_request,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a request's stored status string without parsing it.  The
    /// transition authority uses this to notice values outside the
    /// recognized vocabulary before deciding how to proceed.
    pub fn raw_status(&self, id: Uuid) -> Result<String> {
        self.conn()
            .query_row(
                "SELECT status FROM case_requests WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List case requests matching the filter, newest first, capped at
    /// [`REQUEST_LIST_CAP`].
    pub fn list_case_requests(&self, filter: &RequestFilter) -> Result<Vec<CaseRequest>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REQUEST_COLUMNS} FROM case_requests
             WHERE (?1 IS NULL OR customer_id = ?1)
               AND (?2 IS NULL OR provider_id = ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?4"
        ))?;

        let rows = stmt.query_map(
            params![
                filter.customer_id.map(|c| c.to_string()),
                filter.provider_id.map(|p| p.to_string()),
                filter.status.map(|s| s.to_string()),
                REQUEST_LIST_CAP,
            ],
            row_to_request,
        )?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply field edits outside any transition and bump `updated_at`.
    pub fn update_fields(&self, id: Uuid, edits: &FieldEdits) -> Result<CaseRequest> {
        let now = Utc::now();
        let touched = self.conn().execute(
            "UPDATE case_requests SET
                 title = COALESCE(?2, title),
                 details = COALESCE(?3, details),
                 desired_outcome = COALESCE(?4, desired_outcome),
                 scenario_id = COALESCE(?5, scenario_id),
                 budget_min = COALESCE(?6, budget_min),
                 budget_max = COALESCE(?7, budget_max),
                 updated_at = ?8
             WHERE id = ?1",
            params![
                id.to_string(),
                edits.title,
                edits.details,
                edits.desired_outcome,
                edits.scenario_id.map(|s| s.to_string()),
                edits.budget_min,
                edits.budget_max,
                now.to_rfc3339(),
            ],
        )?;
        if touched == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_case_request(id)
    }

    /// Apply a validated transition atomically: re-check the stored status,
    /// write the new status plus its lifecycle timestamps and any field
    /// edits, append the timeline entry, and record the audit row.  A
    /// stored status that no longer matches `expected` fails with
    /// [`StoreError::Conflict`] and writes nothing.
    pub fn apply_transition(
        &mut self,
        request_id: Uuid,
        expected: &ExpectedStatus,
        change: &StatusChange,
    ) -> Result<CaseRequest> {
        let now = Utc::now();
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored: Option<String> = tx
            .query_row(
                "SELECT status FROM case_requests WHERE id = ?1",
                params![request_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let stored = stored.ok_or(StoreError::NotFound)?;
        if !expected.matches(&stored) {
            return Err(StoreError::Conflict(format!(
                "case request status is now {stored}"
            )));
        }

        let edits = &change.edits;
        tx.execute(
            "UPDATE case_requests SET
                 status = ?2,
                 updated_at = ?3,
                 title = COALESCE(?4, title),
                 details = COALESCE(?5, details),
                 desired_outcome = COALESCE(?6, desired_outcome),
                 scenario_id = COALESCE(?7, scenario_id),
                 budget_min = COALESCE(?8, budget_min),
                 budget_max = COALESCE(?9, budget_max)
             WHERE id = ?1",
            params![
                request_id.to_string(),
                change.to.to_string(),
                now.to_rfc3339(),
                edits.title,
                edits.details,
                edits.desired_outcome,
                edits.scenario_id.map(|s| s.to_string()),
                edits.budget_min,
                edits.budget_max,
            ],
        )?;

        match change.to {
            CaseStatus::Accepted => {
                // First acceptance only; replays keep the original timestamp.
                tx.execute(
                    "UPDATE case_requests SET accepted_at = COALESCE(accepted_at, ?2) WHERE id = ?1",
                    params![request_id.to_string(), now.to_rfc3339()],
                )?;
            }
            CaseStatus::Declined => {
                tx.execute(
                    "UPDATE case_requests SET declined_at = ?2, decline_reason = ?3 WHERE id = ?1",
                    params![
                        request_id.to_string(),
                        now.to_rfc3339(),
                        change.decline_reason,
                    ],
                )?;
            }
            CaseStatus::Cancelled => {
                tx.execute(
                    "UPDATE case_requests SET cancelled_at = ?2 WHERE id = ?1",
                    params![request_id.to_string(), now.to_rfc3339()],
                )?;
            }
            CaseStatus::Completed => {
                tx.execute(
                    "UPDATE case_requests SET completed_at = ?2 WHERE id = ?1",
                    params![request_id.to_string(), now.to_rfc3339()],
                )?;
            }
            CaseStatus::Matching | CaseStatus::InProgress | CaseStatus::Reporting => {}
        }

        timeline::insert_entry_tx(
            &tx,
            &NewTimelineEntry {
                request_id,
                kind: change.entry_kind,
                title: change.entry_title.clone(),
                note: change.entry_note.clone(),
                payload: change.entry_payload.clone(),
                author_id: change.actor_id,
            },
            now,
        )?;

        audit::insert_audit_tx(
            &tx,
            change.actor_id,
            "status.change",
            request_id,
            &stored,
            &change.to.to_string(),
            now,
        )?;

        let updated = tx.query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM case_requests WHERE id = ?1"),
            params![request_id.to_string()],
            row_to_request,
        )?;

        tx.commit()?;
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Hard-delete a case request.  Timeline entries, the chat room and
    /// its messages, and any review cascade away; when a review goes, the
    /// provider's aggregate is re-derived in the same transaction.
    pub fn delete_case_request(&mut self, id: Uuid) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let reviewed_provider: Option<Uuid> = tx
            .query_row(
                "SELECT provider_id FROM reviews WHERE request_id = ?1",
                params![id.to_string()],
                |row| convert::uuid_col(row, 0),
            )
            .optional()?;

        let affected = tx.execute(
            "DELETE FROM case_requests WHERE id = ?1",
            params![id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        if let Some(provider_id) = reviewed_provider {
            reviews::recompute_provider_rating_tx(&tx, provider_id)?;
        }

        tx.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`CaseRequest`].
fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaseRequest> {
    Ok(CaseRequest {
        id: convert::uuid_col(row, 0)?,
        title: row.get(1)?,
        details: row.get(2)?,
        desired_outcome: row.get(3)?,
        status: convert::parsed_col(row, 4)?,
        customer_id: convert::uuid_col(row, 5)?,
        provider_id: convert::uuid_col(row, 6)?,
        scenario_id: convert::opt_uuid_col(row, 7)?,
        budget_min: row.get(8)?,
        budget_max: row.get(9)?,
        decline_reason: row.get(10)?,
        created_at: convert::ts_col(row, 11)?,
        updated_at: convert::ts_col(row, 12)?,
        accepted_at: convert::opt_ts_col(row, 13)?,
        declined_at: convert::opt_ts_col(row, 14)?,
        cancelled_at: convert::opt_ts_col(row, 15)?,
        completed_at: convert::opt_ts_col(row, 16)?,
    })
}
