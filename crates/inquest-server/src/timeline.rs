//! Timeline operations: the ordered ledger read and the manual note append.
//!
//! Lifecycle entries are written by request creation and by transitions;
//! participants may only append the note-like kinds.  A structured payload
//! must both deserialize and fit the entry kind it rides on.

use inquest_shared::{Capability, TimelineKind, TimelinePayload};
use inquest_store::{Database, NewTimelineEntry, TimelineEntry};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::error::ApiError;
use crate::requests::{clean, load_case_access};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppendEntryBody {
    pub kind: String,
    pub title: Option<String>,
    pub note: Option<String>,
    pub payload: Option<serde_json::Value>,
}

pub fn read(
    db: &Database,
    identity: &Identity,
    request_id: Uuid,
) -> Result<Vec<TimelineEntry>, ApiError> {
    auth::require(identity, Capability::TimelineRead)?;

    let access = load_case_access(db, identity, request_id)?;
    if !access.can_view() {
        return Err(ApiError::Forbidden(
            "Only the case participants or an administrator may read the timeline".to_string(),
        ));
    }

    Ok(db.list_timeline_entries(request_id)?)
}

pub fn append(
    db: &mut Database,
    identity: &Identity,
    request_id: Uuid,
    body: AppendEntryBody,
) -> Result<TimelineEntry, ApiError> {
    auth::require(identity, Capability::TimelineAppend)?;

    let access = load_case_access(db, identity, request_id)?;
    if !access.can_view() {
        return Err(ApiError::Forbidden(
            "Only the case participants or an administrator may write to the timeline"
                .to_string(),
        ));
    }

    let kind: TimelineKind = body
        .kind
        .parse()
        .map_err(|_| ApiError::Validation(format!("unrecognized timeline kind: {}", body.kind)))?;
    if !kind.participant_writable() {
        return Err(ApiError::Validation(format!(
            "{kind} entries are written by the engine, not by participants"
        )));
    }

    let payload = match body.payload {
        Some(value) => {
            let typed: TimelinePayload = serde_json::from_value(value.clone())
                .map_err(|e| ApiError::Validation(format!("malformed payload: {e}")))?;
            if !payload_fits(kind, &typed) {
                return Err(ApiError::Validation(format!(
                    "payload schema does not fit {kind}"
                )));
            }
            Some(value)
        }
        None => None,
    };

    Ok(db.append_timeline_entry(&NewTimelineEntry {
        request_id,
        kind,
        title: clean(body.title),
        note: clean(body.note),
        payload,
        author_id: identity.user_id,
    })?)
}

/// Which payload schema belongs to which kind.
fn payload_fits(kind: TimelineKind, payload: &TimelinePayload) -> bool {
    matches!(
        (kind, payload),
        (TimelineKind::InterimReport, TimelinePayload::ReportSummary { .. })
            | (TimelineKind::FinalReport, TimelinePayload::ReportSummary { .. })
            | (TimelineKind::StatusAdvanced, TimelinePayload::CompletionNote { .. })
            | (TimelineKind::AttachmentShared, TimelinePayload::Attachment { .. })
    )
}
