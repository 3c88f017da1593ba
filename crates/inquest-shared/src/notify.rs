//! Notification kinds written to the delivery sink.
//!
//! The core only inserts notification records; delivery (and read
//! tracking) belongs to the external notification system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new case request was assigned to a provider.
    CaseAssigned,
    /// A case request changed status.
    CaseStatusChanged,
    /// A chat message arrived from the other participant.
    ChatMessage,
    /// A review was submitted or updated for a completed case.
    ReviewSubmitted,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::CaseAssigned => "case_assigned",
            NotificationKind::CaseStatusChanged => "case_status_changed",
            NotificationKind::ChatMessage => "chat_message",
            NotificationKind::ReviewSubmitted => "review_submitted",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "case_assigned" => Ok(NotificationKind::CaseAssigned),
            "case_status_changed" => Ok(NotificationKind::CaseStatusChanged),
            "chat_message" => Ok(NotificationKind::ChatMessage),
            "review_submitted" => Ok(NotificationKind::ReviewSubmitted),
            _ => Err(format!("Unrecognized notification kind: {}", s)),
        }
    }
}
