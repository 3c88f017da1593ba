//! Case request operations: create, list, read, patch, delete, and the
//! admin audit trail.
//!
//! PATCH carries field edits, a status change, or both; when both are
//! present the edits join the transition's transaction.  The stored status
//! is re-checked inside that transaction, so a concurrent writer loses
//! with a conflict instead of corrupting the row.

use inquest_shared::{Capability, CaseStatus, Role};
use inquest_store::{
    AuditRecord, CaseRequest, Database, ExpectedStatus, FieldEdits, NewCaseRequest,
    ProviderStatus, RequestFilter, StatusChange,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::error::ApiError;
use crate::notify;
use crate::transition::{self, TransitionContext};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCaseRequestBody {
    pub title: String,
    pub details: String,
    pub desired_outcome: Option<String>,
    pub provider_id: Uuid,
    pub scenario_id: Option<Uuid>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchCaseRequestBody {
    /// Target status; absent means a pure field edit.
    pub status: Option<String>,
    /// Required when the target status is `DECLINED`.
    pub decline_reason: Option<String>,
    /// Free-text note attached to the transition's timeline entry.
    pub note: Option<String>,
    pub title: Option<String>,
    pub details: Option<String>,
    pub desired_outcome: Option<String>,
    pub scenario_id: Option<Uuid>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
    /// `customer` lets an investigator list the requests they opened
    /// themselves instead of the ones assigned to them.
    pub view: Option<String>,
    pub customer_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Access resolution
// ---------------------------------------------------------------------------

/// A case request together with the actor's relationship to it.
pub(crate) struct CaseAccess {
    pub request: CaseRequest,
    pub is_owner: bool,
    pub is_provider: bool,
    pub is_admin: bool,
}

impl CaseAccess {
    pub fn is_participant(&self) -> bool {
        self.is_owner || self.is_provider
    }

    pub fn can_view(&self) -> bool {
        self.is_participant() || self.is_admin
    }
}

/// Load a request and work out whether the actor owns it, works it, or
/// administers it.
pub(crate) fn load_case_access(
    db: &Database,
    identity: &Identity,
    request_id: Uuid,
) -> Result<CaseAccess, ApiError> {
    let request = db.get_case_request(request_id)?;
    let is_owner = request.customer_id == identity.user_id;
    let is_provider = match db.find_provider_for_user(identity.user_id)? {
        Some(provider) => provider.id == request.provider_id,
        None => false,
    };
    Ok(CaseAccess {
        request,
        is_owner,
        is_provider,
        is_admin: identity.is_admin(),
    })
}

/// Trim free text, mapping blank to absent.
pub(crate) fn clean(text: Option<String>) -> Option<String> {
    text.and_then(|t| {
        let trimmed = t.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

pub fn create(
    db: &mut Database,
    identity: &Identity,
    body: CreateCaseRequestBody,
) -> Result<CaseRequest, ApiError> {
    auth::require(identity, Capability::CaseRequestCreate)?;

    let title = body.title.trim().to_string();
    if title.chars().count() < 2 {
        return Err(ApiError::Validation(
            "title must be at least 2 characters".to_string(),
        ));
    }
    let details = body.details.trim().to_string();
    if details.chars().count() < 5 {
        return Err(ApiError::Validation(
            "details must be at least 5 characters".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (body.budget_min, body.budget_max) {
        if min > max {
            return Err(ApiError::Validation(
                "budget_min may not exceed budget_max".to_string(),
            ));
        }
    }

    let provider = db
        .find_provider(body.provider_id)?
        .ok_or(ApiError::ProviderNotFound)?;
    if provider.status != ProviderStatus::Approved {
        return Err(ApiError::ProviderNotAvailable);
    }

    if let Some(scenario_id) = body.scenario_id {
        if !db.scenario_exists(scenario_id)? {
            return Err(ApiError::ScenarioNotFound);
        }
    }

    let request = db.create_case_request(&NewCaseRequest {
        title,
        details,
        desired_outcome: clean(body.desired_outcome),
        customer_id: identity.user_id,
        provider_id: provider.id,
        scenario_id: body.scenario_id,
        budget_min: body.budget_min,
        budget_max: body.budget_max,
    })?;

    notify::case_assigned(db, &request, provider.user_id);

    Ok(request)
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

pub fn list(
    db: &Database,
    identity: &Identity,
    query: ListRequestsQuery,
) -> Result<Vec<CaseRequest>, ApiError> {
    auth::require(identity, Capability::CaseRequestRead)?;

    let status = match &query.status {
        Some(raw) => Some(
            raw.parse::<CaseStatus>()
                .map_err(|_| ApiError::InvalidStatus(raw.clone()))?,
        ),
        None => None,
    };

    if let Some(view) = query.view.as_deref() {
        if view != "customer" {
            return Err(ApiError::Validation(format!("unknown view: {view}")));
        }
    }

    let filter = match identity.role {
        Role::Admin | Role::SuperAdmin => RequestFilter {
            customer_id: query.customer_id,
            provider_id: query.provider_id,
            status,
        },
        Role::Customer => RequestFilter {
            customer_id: Some(identity.user_id),
            provider_id: None,
            status,
        },
        Role::Investigator => {
            if query.view.as_deref() == Some("customer") {
                RequestFilter {
                    customer_id: Some(identity.user_id),
                    provider_id: None,
                    status,
                }
            } else {
                match db.find_provider_for_user(identity.user_id)? {
                    Some(provider) => RequestFilter {
                        customer_id: None,
                        provider_id: Some(provider.id),
                        status,
                    },
                    // No provider profile, nothing assigned.
                    None => return Ok(Vec::new()),
                }
            }
        }
    };

    Ok(db.list_case_requests(&filter)?)
}

pub fn get(db: &Database, identity: &Identity, request_id: Uuid) -> Result<CaseRequest, ApiError> {
    auth::require(identity, Capability::CaseRequestRead)?;

    let access = load_case_access(db, identity, request_id)?;
    if !access.can_view() {
        return Err(ApiError::Forbidden(
            "Only the case participants or an administrator may view this case request"
                .to_string(),
        ));
    }
    Ok(access.request)
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

pub fn patch(
    db: &mut Database,
    identity: &Identity,
    request_id: Uuid,
    body: PatchCaseRequestBody,
) -> Result<CaseRequest, ApiError> {
    if body.status.is_some() {
        auth::require(identity, Capability::CaseTransition)?;
    } else {
        auth::require(identity, Capability::CaseRequestEdit)?;
    }

    // Target parse comes before everything else so the caller learns about
    // a bad status value even when other parts of the body are off too.
    let target = match &body.status {
        Some(raw) => Some(
            raw.parse::<CaseStatus>()
                .map_err(|_| ApiError::InvalidStatus(raw.clone()))?,
        ),
        None => None,
    };

    let stored = db.raw_status(request_id)?;

    match stored.parse::<CaseStatus>() {
        Ok(current) => patch_recognized(db, identity, request_id, current, target, body),
        // A stored status outside the vocabulary should not happen; only
        // admins may move the row back onto the map.
        Err(_) => {
            if !identity.is_admin() {
                return Err(ApiError::Internal(format!(
                    "stored status {stored:?} is not recognized"
                )));
            }
            let target = target.ok_or_else(|| {
                ApiError::Validation(
                    "a target status is required to repair this case request".to_string(),
                )
            })?;
            force_set(db, identity, request_id, &stored, target, body)
        }
    }
}

fn patch_recognized(
    db: &mut Database,
    identity: &Identity,
    request_id: Uuid,
    current: CaseStatus,
    target: Option<CaseStatus>,
    body: PatchCaseRequestBody,
) -> Result<CaseRequest, ApiError> {
    let access = load_case_access(db, identity, request_id)?;

    let Some(target) = target else {
        // Pure field edit.
        if !access.can_view() {
            return Err(ApiError::Forbidden(
                "Only the case participants or an administrator may edit this case request"
                    .to_string(),
            ));
        }
        let edits = validate_edits(&body, &access.request)?;
        if edits.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }
        if let Some(scenario_id) = edits.scenario_id {
            if !db.scenario_exists(scenario_id)? {
                return Err(ApiError::ScenarioNotFound);
            }
        }
        return Ok(db.update_fields(request_id, &edits)?);
    };

    let ctx = TransitionContext {
        is_owner: access.is_owner,
        is_assigned_provider: access.is_provider,
        is_admin: access.is_admin,
    };
    transition::evaluate(&ctx, current, target, body.decline_reason.as_deref())?;

    let edits = validate_edits(&body, &access.request)?;
    if let Some(scenario_id) = edits.scenario_id {
        if !db.scenario_exists(scenario_id)? {
            return Err(ApiError::ScenarioNotFound);
        }
    }

    let reason = clean(body.decline_reason);
    let planned = transition::plan_entry(
        target,
        access.is_owner,
        clean(body.note),
        reason.as_deref(),
    )?;

    let change = StatusChange {
        to: target,
        decline_reason: reason,
        entry_kind: planned.kind,
        entry_title: planned.title,
        entry_note: planned.note,
        entry_payload: planned.payload,
        actor_id: identity.user_id,
        edits,
    };

    let updated = db.apply_transition(request_id, &ExpectedStatus::Is(current), &change)?;

    notify::status_changed(db, &updated, identity.user_id, &current.to_string());

    Ok(updated)
}

/// Admin repair for a stored status outside the vocabulary.  Field edits do
/// not ride this path: validating them needs the full row, which cannot be
/// decoded while the status is unrecognized.
fn force_set(
    db: &mut Database,
    identity: &Identity,
    request_id: Uuid,
    stored: &str,
    target: CaseStatus,
    body: PatchCaseRequestBody,
) -> Result<CaseRequest, ApiError> {
    if target == CaseStatus::Declined
        && body.decline_reason.as_deref().map_or(true, |r| r.trim().is_empty())
    {
        return Err(ApiError::MissingDeclineReason);
    }

    let reason = clean(body.decline_reason);
    let planned = transition::plan_entry(target, false, clean(body.note), reason.as_deref())?;

    let change = StatusChange {
        to: target,
        decline_reason: reason,
        entry_kind: planned.kind,
        entry_title: planned.title,
        entry_note: planned.note,
        entry_payload: planned.payload,
        actor_id: identity.user_id,
        edits: FieldEdits::default(),
    };

    let updated =
        db.apply_transition(request_id, &ExpectedStatus::Raw(stored.to_string()), &change)?;

    tracing::warn!(request = %request_id, from = %stored, to = %target,
        "force-set case request out of unrecognized status");

    notify::status_changed(db, &updated, identity.user_id, stored);

    Ok(updated)
}

fn validate_edits(
    body: &PatchCaseRequestBody,
    request: &CaseRequest,
) -> Result<FieldEdits, ApiError> {
    let title = match &body.title {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.chars().count() < 2 {
                return Err(ApiError::Validation(
                    "title must be at least 2 characters".to_string(),
                ));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let details = match &body.details {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.chars().count() < 5 {
                return Err(ApiError::Validation(
                    "details must be at least 5 characters".to_string(),
                ));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    // Check the bounds the row will end up with, not just the ones supplied.
    let effective_min = body.budget_min.or(request.budget_min);
    let effective_max = body.budget_max.or(request.budget_max);
    if let (Some(min), Some(max)) = (effective_min, effective_max) {
        if min > max {
            return Err(ApiError::Validation(
                "budget_min may not exceed budget_max".to_string(),
            ));
        }
    }

    Ok(FieldEdits {
        title,
        details,
        desired_outcome: body.desired_outcome.as_ref().map(|s| s.trim().to_string()),
        scenario_id: body.scenario_id,
        budget_min: body.budget_min,
        budget_max: body.budget_max,
    })
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

pub fn delete(db: &mut Database, identity: &Identity, request_id: Uuid) -> Result<(), ApiError> {
    auth::require(identity, Capability::CaseRequestDelete)?;

    // Admins may delete regardless of state, including rows whose stored
    // status no longer decodes.
    if identity.is_admin() {
        return Ok(db.delete_case_request(request_id)?);
    }

    let access = load_case_access(db, identity, request_id)?;
    if !access.is_owner {
        return Err(ApiError::Forbidden(
            "Only the owner or an administrator may delete a case request".to_string(),
        ));
    }
    match access.request.status {
        CaseStatus::Matching | CaseStatus::Declined | CaseStatus::Cancelled => {}
        status => {
            return Err(ApiError::Forbidden(format!(
                "A case request in {status} can no longer be deleted by its owner"
            )));
        }
    }

    Ok(db.delete_case_request(request_id)?)
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

pub fn audit_trail(
    db: &Database,
    identity: &Identity,
    request_id: Uuid,
) -> Result<Vec<AuditRecord>, ApiError> {
    auth::require(identity, Capability::CaseAdminOverride)?;

    // Existence check that works even when the stored status is corrupt.
    db.raw_status(request_id)?;

    Ok(db.list_audit_records(request_id)?)
}
