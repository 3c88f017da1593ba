//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer as a JSON body.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use inquest_shared::{CaseStatus, NotificationKind, Role, TimelineKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User account
// ---------------------------------------------------------------------------

/// A mirrored user identity.  Authentication happens upstream; this record
/// only carries what the lifecycle engine needs to attribute actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    /// Unique user identifier.
    pub id: Uuid,
    /// Optional human-readable display name.
    pub display_name: Option<String>,
    /// The user's role, fixed at mirror time.
    pub role: Role,
    /// When this account was first mirrored locally.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Lifecycle state of a provider profile in the directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Profile submitted, not yet vetted.
    Pending,
    /// Vetted and open for new case requests.
    Approved,
    /// Barred from receiving new case requests.
    Suspended,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderStatus::Pending => "pending",
            ProviderStatus::Approved => "approved",
            ProviderStatus::Suspended => "suspended",
        };
        f.write_str(s)
    }
}

impl FromStr for ProviderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ProviderStatus::Pending),
            "approved" => Ok(ProviderStatus::Approved),
            "suspended" => Ok(ProviderStatus::Suspended),
            other => Err(format!("unknown provider status: {other}")),
        }
    }
}

/// A provider (investigator) profile.  The engine reads the status to gate
/// new case requests and owns the denormalized rating aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    /// Unique provider identifier.
    pub id: Uuid,
    /// The user account the provider signs in with.
    pub user_id: Uuid,
    /// Public display name shown to customers.
    pub display_name: String,
    /// Vetting state; only `approved` providers accept new requests.
    pub status: ProviderStatus,
    /// Mean of all review ratings, recomputed on every review write.
    pub rating: f64,
    /// Number of reviews backing the mean.
    pub review_count: i64,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Scenario template
// ---------------------------------------------------------------------------

/// A catalog entry a case request may reference.  The engine only checks
/// existence; the catalog itself is maintained elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    /// Unique scenario identifier.
    pub id: Uuid,
    /// Short human-readable title.
    pub title: String,
    /// When the template was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Case request
// ---------------------------------------------------------------------------

/// A customer's request for investigative work, bound to one provider for
/// its whole life.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseRequest {
    /// Unique request identifier.
    pub id: Uuid,
    /// Short summary of the engagement.
    pub title: String,
    /// Full description of the work requested.
    pub details: String,
    /// What the customer hopes to get out of the engagement.
    pub desired_outcome: Option<String>,
    /// Current lifecycle status.
    pub status: CaseStatus,
    /// The customer who opened the request.
    pub customer_id: Uuid,
    /// The provider the request is addressed to.  Never changes.
    pub provider_id: Uuid,
    /// Optional scenario template this request was started from.
    pub scenario_id: Option<Uuid>,
    /// Lower bound of the customer's budget, in minor currency units.
    pub budget_min: Option<i64>,
    /// Upper bound of the customer's budget, in minor currency units.
    pub budget_max: Option<i64>,
    /// Why the provider declined; set together with `DECLINED`.
    pub decline_reason: Option<String>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last written.
    pub updated_at: DateTime<Utc>,
    /// First time the request entered `ACCEPTED`, if ever.
    pub accepted_at: Option<DateTime<Utc>>,
    /// When the request entered `DECLINED`, if ever.
    pub declined_at: Option<DateTime<Utc>>,
    /// When the request entered `CANCELLED`, if ever.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// When the request entered `COMPLETED`, if ever.
    pub completed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Timeline entry
// ---------------------------------------------------------------------------

/// One record in a case request's append-only timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// The case request this entry belongs to.
    pub request_id: Uuid,
    /// What happened.
    pub kind: TimelineKind,
    /// Optional short headline.
    pub title: Option<String>,
    /// Optional free-text body.
    pub note: Option<String>,
    /// Optional structured payload; the JSON schema depends on `kind`.
    pub payload: Option<serde_json::Value>,
    /// Who wrote the entry.
    pub author_id: Uuid,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// The single conversation channel attached to a case request.  Created
/// lazily on first use, one per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRoom {
    /// Unique room identifier.
    pub id: Uuid,
    /// The case request this room belongs to.
    pub request_id: Uuid,
    /// The customer side of the conversation.
    pub customer_id: Uuid,
    /// The provider side, addressed by user account (not provider profile).
    pub provider_user_id: Uuid,
    /// Preview of the latest message, truncated for list views.
    pub last_message: Option<String>,
    /// When the latest message arrived.
    pub last_message_at: Option<DateTime<Utc>>,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
}

/// A file reference carried on a chat message.  Upload and storage happen
/// elsewhere; the engine stores only the pointer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatAttachment {
    /// Original file name.
    pub file_name: String,
    /// Where the file can be fetched.
    pub url: String,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: Uuid,
    /// The room this message belongs to.
    pub room_id: Uuid,
    /// Who sent it.
    pub sender_id: Uuid,
    /// Message text.
    pub content: String,
    /// Attached file references, if any.
    pub attachments: Vec<ChatAttachment>,
    /// When the message was sent.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// The customer's one review of a completed case request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    /// Unique review identifier.
    pub id: Uuid,
    /// The completed case request being reviewed.
    pub request_id: Uuid,
    /// The provider the rating counts against.
    pub provider_id: Uuid,
    /// The reviewing customer.
    pub customer_id: Uuid,
    /// Star rating, 1 through 5.
    pub rating: i32,
    /// Optional free-text comment.
    pub comment: Option<String>,
    /// When the review was first submitted.
    pub created_at: DateTime<Utc>,
    /// When the review was last edited.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// An outbox record for the external notification system.  The engine only
/// writes these; delivery and read tracking happen elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: Uuid,
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
    /// When the notification was read, if ever.
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was written.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Audit record
// ---------------------------------------------------------------------------

/// An actor-attributed status change, kept for compliance tracing.  Statuses
/// are stored as raw strings so the trail is faithful even when a stored
/// value predates the current vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Who performed the change.
    pub actor_id: Uuid,
    /// Machine-readable action name, e.g. `status.change`.
    pub action: String,
    /// The case request affected.
    pub request_id: Uuid,
    /// Status before the change, exactly as stored.
    pub from_status: String,
    /// Status after the change.
    pub to_status: String,
    /// When the change happened.
    pub created_at: DateTime<Utc>,
}
