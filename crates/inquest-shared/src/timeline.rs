//! Timeline event vocabulary and typed entry payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of timeline entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineKind {
    RequestCreated,
    InvestigatorAssigned,
    InvestigatorAccepted,
    InvestigatorDeclined,
    StatusAdvanced,
    ProgressNote,
    InterimReport,
    FinalReport,
    AttachmentShared,
    CustomerCancelled,
    /// Reserved for operational tooling; no producer inside this core.
    System,
}

impl TimelineKind {
    pub const ALL: [TimelineKind; 11] = [
        TimelineKind::RequestCreated,
        TimelineKind::InvestigatorAssigned,
        TimelineKind::InvestigatorAccepted,
        TimelineKind::InvestigatorDeclined,
        TimelineKind::StatusAdvanced,
        TimelineKind::ProgressNote,
        TimelineKind::InterimReport,
        TimelineKind::FinalReport,
        TimelineKind::AttachmentShared,
        TimelineKind::CustomerCancelled,
        TimelineKind::System,
    ];

    /// Kinds the case participants may append directly via the manual-note
    /// operation.  Every other kind is produced only as a side effect of
    /// request creation or a status transition.
    pub fn participant_writable(self) -> bool {
        matches!(
            self,
            TimelineKind::ProgressNote
                | TimelineKind::InterimReport
                | TimelineKind::FinalReport
                | TimelineKind::AttachmentShared
                | TimelineKind::StatusAdvanced
        )
    }
}

impl fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimelineKind::RequestCreated => "REQUEST_CREATED",
            TimelineKind::InvestigatorAssigned => "INVESTIGATOR_ASSIGNED",
            TimelineKind::InvestigatorAccepted => "INVESTIGATOR_ACCEPTED",
            TimelineKind::InvestigatorDeclined => "INVESTIGATOR_DECLINED",
            TimelineKind::StatusAdvanced => "STATUS_ADVANCED",
            TimelineKind::ProgressNote => "PROGRESS_NOTE",
            TimelineKind::InterimReport => "INTERIM_REPORT",
            TimelineKind::FinalReport => "FINAL_REPORT",
            TimelineKind::AttachmentShared => "ATTACHMENT_SHARED",
            TimelineKind::CustomerCancelled => "CUSTOMER_CANCELLED",
            TimelineKind::System => "SYSTEM",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TimelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REQUEST_CREATED" => Ok(TimelineKind::RequestCreated),
            "INVESTIGATOR_ASSIGNED" => Ok(TimelineKind::InvestigatorAssigned),
            "INVESTIGATOR_ACCEPTED" => Ok(TimelineKind::InvestigatorAccepted),
            "INVESTIGATOR_DECLINED" => Ok(TimelineKind::InvestigatorDeclined),
            "STATUS_ADVANCED" => Ok(TimelineKind::StatusAdvanced),
            "PROGRESS_NOTE" => Ok(TimelineKind::ProgressNote),
            "INTERIM_REPORT" => Ok(TimelineKind::InterimReport),
            "FINAL_REPORT" => Ok(TimelineKind::FinalReport),
            "ATTACHMENT_SHARED" => Ok(TimelineKind::AttachmentShared),
            "CUSTOMER_CANCELLED" => Ok(TimelineKind::CustomerCancelled),
            "SYSTEM" => Ok(TimelineKind::System),
            _ => Err(format!("Unrecognized timeline entry kind: {}", s)),
        }
    }
}

/// Structured payload carried by some timeline entries.  Tagged by variant
/// so each kind of payload has its own schema and round-trips cleanly,
/// instead of a free-form blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelinePayload {
    /// Summary attached when a case moves into reporting.
    ReportSummary { summary: String },
    /// Closing note attached when a case completes.
    CompletionNote { note: String },
    /// Shared file reference.
    Attachment { file_name: String, url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_subset_is_exact() {
        let writable: Vec<_> = TimelineKind::ALL
            .iter()
            .copied()
            .filter(|k| k.participant_writable())
            .collect();
        assert_eq!(
            writable,
            vec![
                TimelineKind::StatusAdvanced,
                TimelineKind::ProgressNote,
                TimelineKind::InterimReport,
                TimelineKind::FinalReport,
                TimelineKind::AttachmentShared,
            ]
        );
    }

    #[test]
    fn system_and_lifecycle_kinds_not_writable() {
        assert!(!TimelineKind::RequestCreated.participant_writable());
        assert!(!TimelineKind::InvestigatorAssigned.participant_writable());
        assert!(!TimelineKind::InvestigatorAccepted.participant_writable());
        assert!(!TimelineKind::InvestigatorDeclined.participant_writable());
        assert!(!TimelineKind::CustomerCancelled.participant_writable());
        assert!(!TimelineKind::System.participant_writable());
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in TimelineKind::ALL {
            assert_eq!(kind.to_string().parse::<TimelineKind>().unwrap(), kind);
        }
        assert!("NOTE".parse::<TimelineKind>().is_err());
    }

    #[test]
    fn payload_round_trips_tagged() {
        let payload = TimelinePayload::ReportSummary {
            summary: "Subject located".into(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"type\":\"report_summary\""));
        let back: TimelinePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);

        let attachment = TimelinePayload::Attachment {
            file_name: "findings.pdf".into(),
            url: "blob://findings".into(),
        };
        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("\"type\":\"attachment\""));
        assert_eq!(
            serde_json::from_str::<TimelinePayload>(&json).unwrap(),
            attachment
        );
    }
}
