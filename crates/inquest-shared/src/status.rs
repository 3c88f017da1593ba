//! Case request status vocabulary and the allowed-edge table.
//!
//! The table is the single source of truth for which transitions exist;
//! every transition request routes through it.  Actor permissions are a
//! separate concern layered on top by the server's transition authority.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a case request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    /// Created and waiting for the assigned investigator to respond.
    Matching,
    /// Investigator accepted the case.
    Accepted,
    /// Work underway.
    InProgress,
    /// Final report being prepared; can fall back to in-progress.
    Reporting,
    /// Terminal: delivered and closed.
    Completed,
    /// Terminal: investigator declined while matching.
    Declined,
    /// Terminal: customer (or admin) cancelled.
    Cancelled,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 7] = [
        CaseStatus::Matching,
        CaseStatus::Accepted,
        CaseStatus::InProgress,
        CaseStatus::Reporting,
        CaseStatus::Completed,
        CaseStatus::Declined,
        CaseStatus::Cancelled,
    ];

    /// Statuses reachable from `self` in one transition.
    pub fn allowed_next(self) -> &'static [CaseStatus] {
        match self {
            CaseStatus::Matching => &[
                CaseStatus::Accepted,
                CaseStatus::Declined,
                CaseStatus::Cancelled,
            ],
            CaseStatus::Accepted => &[CaseStatus::InProgress, CaseStatus::Cancelled],
            CaseStatus::InProgress => &[CaseStatus::Reporting, CaseStatus::Cancelled],
            CaseStatus::Reporting => &[
                CaseStatus::InProgress,
                CaseStatus::Completed,
                CaseStatus::Cancelled,
            ],
            CaseStatus::Completed | CaseStatus::Declined | CaseStatus::Cancelled => &[],
        }
    }

    pub fn can_transition(self, to: CaseStatus) -> bool {
        self.allowed_next().contains(&to)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaseStatus::Matching => "MATCHING",
            CaseStatus::Accepted => "ACCEPTED",
            CaseStatus::InProgress => "IN_PROGRESS",
            CaseStatus::Reporting => "REPORTING",
            CaseStatus::Completed => "COMPLETED",
            CaseStatus::Declined => "DECLINED",
            CaseStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MATCHING" => Ok(CaseStatus::Matching),
            "ACCEPTED" => Ok(CaseStatus::Accepted),
            "IN_PROGRESS" => Ok(CaseStatus::InProgress),
            "REPORTING" => Ok(CaseStatus::Reporting),
            "COMPLETED" => Ok(CaseStatus::Completed),
            "DECLINED" => Ok(CaseStatus::Declined),
            "CANCELLED" => Ok(CaseStatus::Cancelled),
            _ => Err(format!("Unrecognized case status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_table_matches_design() {
        use CaseStatus::*;

        assert_eq!(Matching.allowed_next(), &[Accepted, Declined, Cancelled]);
        assert_eq!(Accepted.allowed_next(), &[InProgress, Cancelled]);
        assert_eq!(InProgress.allowed_next(), &[Reporting, Cancelled]);
        assert_eq!(Reporting.allowed_next(), &[InProgress, Completed, Cancelled]);
        assert!(Completed.allowed_next().is_empty());
        assert!(Declined.allowed_next().is_empty());
        assert!(Cancelled.allowed_next().is_empty());
    }

    #[test]
    fn terminal_statuses_have_no_edges() {
        for status in CaseStatus::ALL {
            assert_eq!(status.is_terminal(), status.allowed_next().is_empty());
        }
        assert!(CaseStatus::Completed.is_terminal());
        assert!(CaseStatus::Declined.is_terminal());
        assert!(CaseStatus::Cancelled.is_terminal());
        assert!(!CaseStatus::Matching.is_terminal());
    }

    #[test]
    fn no_self_edges() {
        for status in CaseStatus::ALL {
            assert!(!status.can_transition(status));
        }
    }

    #[test]
    fn decline_reachable_only_from_matching() {
        for status in CaseStatus::ALL {
            let reachable = status.can_transition(CaseStatus::Declined);
            assert_eq!(reachable, status == CaseStatus::Matching);
        }
    }

    #[test]
    fn round_trips_through_strings() {
        for status in CaseStatus::ALL {
            assert_eq!(status.to_string().parse::<CaseStatus>().unwrap(), status);
        }
        assert_eq!(
            "in_progress".parse::<CaseStatus>().unwrap(),
            CaseStatus::InProgress
        );
        assert!("PAUSED".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn serde_uses_wire_form() {
        let json = serde_json::to_string(&CaseStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let back: CaseStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(back, CaseStatus::Cancelled);
    }
}
