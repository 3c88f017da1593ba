//! Transition authority for case requests.
//!
//! [`evaluate`] decides whether an actor may move a request between two
//! statuses.  The checks run in a fixed order so every failure mode has one
//! stable answer: sameness first, then actor permissions, then the
//! decline-reason rule, and the allowed-edge table last.  [`plan_entry`]
//! picks the timeline record each move leaves behind.

use inquest_shared::{CaseStatus, TimelineKind, TimelinePayload};

use crate::error::ApiError;

/// The actor's relationship to the case request under change.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    pub is_owner: bool,
    pub is_assigned_provider: bool,
    pub is_admin: bool,
}

/// Decide whether this actor may move the request from `current` to
/// `target`.
pub fn evaluate(
    ctx: &TransitionContext,
    current: CaseStatus,
    target: CaseStatus,
    decline_reason: Option<&str>,
) -> Result<(), ApiError> {
    if current == target {
        return Err(ApiError::StatusUnchanged(current));
    }

    if !ctx.is_admin {
        if ctx.is_assigned_provider {
            match target {
                CaseStatus::Accepted
                | CaseStatus::InProgress
                | CaseStatus::Reporting
                | CaseStatus::Completed => {}
                // Declining is only an answer to a pending assignment.
                CaseStatus::Declined => {
                    if current != CaseStatus::Matching {
                        return Err(ApiError::TransitionNotAllowed {
                            from: current,
                            to: target,
                        });
                    }
                }
                CaseStatus::Cancelled | CaseStatus::Matching => {
                    return Err(ApiError::Forbidden(format!(
                        "Investigators may not move a case to {target}"
                    )));
                }
            }
        } else if ctx.is_owner {
            if target != CaseStatus::Cancelled {
                return Err(ApiError::Forbidden(
                    "Customers may only cancel their case requests".to_string(),
                ));
            }
        } else {
            return Err(ApiError::Forbidden(
                "Only the case participants or an administrator may change the status"
                    .to_string(),
            ));
        }
    }

    // Applies to every actor, admins included.
    if target == CaseStatus::Declined && decline_reason.map_or(true, |r| r.trim().is_empty()) {
        return Err(ApiError::MissingDeclineReason);
    }

    if !current.can_transition(target) {
        return Err(ApiError::TransitionNotAllowed {
            from: current,
            to: target,
        });
    }

    Ok(())
}

/// The timeline record a transition leaves behind.
#[derive(Debug, Clone)]
pub struct PlannedEntry {
    pub kind: TimelineKind,
    pub title: Option<String>,
    pub note: Option<String>,
    pub payload: Option<serde_json::Value>,
}

/// Pick the timeline entry for a move into `target`.  The caller's free-text
/// note becomes a structured payload where the kind defines one.
pub fn plan_entry(
    target: CaseStatus,
    actor_is_owner: bool,
    note: Option<String>,
    decline_reason: Option<&str>,
) -> Result<PlannedEntry, ApiError> {
    let encode = |payload: TimelinePayload| {
        serde_json::to_value(payload)
            .map_err(|e| ApiError::Internal(format!("could not encode timeline payload: {e}")))
    };

    let entry = match target {
        CaseStatus::Accepted => PlannedEntry {
            kind: TimelineKind::InvestigatorAccepted,
            title: Some("Investigator accepted the case".to_string()),
            note,
            payload: None,
        },
        CaseStatus::Declined => PlannedEntry {
            kind: TimelineKind::InvestigatorDeclined,
            title: Some("Investigator declined the case".to_string()),
            note: decline_reason.map(str::to_string),
            payload: None,
        },
        CaseStatus::InProgress => PlannedEntry {
            kind: TimelineKind::StatusAdvanced,
            title: Some("Work started".to_string()),
            note,
            payload: None,
        },
        CaseStatus::Reporting => {
            let payload = note
                .as_ref()
                .map(|summary| {
                    encode(TimelinePayload::ReportSummary {
                        summary: summary.clone(),
                    })
                })
                .transpose()?;
            PlannedEntry {
                kind: TimelineKind::FinalReport,
                title: Some("Final report in preparation".to_string()),
                note,
                payload,
            }
        }
        CaseStatus::Completed => {
            let payload = note
                .as_ref()
                .map(|text| encode(TimelinePayload::CompletionNote { note: text.clone() }))
                .transpose()?;
            PlannedEntry {
                kind: TimelineKind::StatusAdvanced,
                title: Some("Case completed".to_string()),
                note,
                payload,
            }
        }
        CaseStatus::Cancelled if actor_is_owner => PlannedEntry {
            kind: TimelineKind::CustomerCancelled,
            title: Some("Customer cancelled the request".to_string()),
            note,
            payload: None,
        },
        // Admin cancellations and force-sets land here.
        _ => PlannedEntry {
            kind: TimelineKind::StatusAdvanced,
            title: Some(format!("Status set to {target}")),
            note,
            payload: None,
        },
    };

    Ok(entry)
}
