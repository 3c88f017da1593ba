//! Actor roles and the static role-to-capability table.
//!
//! Every endpoint names one required [`Capability`] which is checked here
//! before any business logic runs.  Object-level rules (ownership,
//! participation, the transition matrix) live with the components that own
//! them; this table only answers "may this role ever perform this kind of
//! operation".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of actor roles handed to the core by the identity gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Requests cases and owns them.
    Customer,
    /// Approved service provider; works cases assigned to them.
    Investigator,
    /// Platform staff.
    Admin,
    /// Platform staff with full control.  Interchangeable with [`Role::Admin`]
    /// inside this core.
    SuperAdmin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Investigator => write!(f, "investigator"),
            Role::Admin => write!(f, "admin"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "investigator" => Ok(Role::Investigator),
            "admin" => Ok(Role::Admin),
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(format!(
                "Unknown role: {}. Use customer, investigator, admin, or super_admin",
                s
            )),
        }
    }
}

/// Operations an endpoint can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CaseRequestCreate,
    CaseRequestRead,
    CaseRequestEdit,
    CaseRequestDelete,
    CaseTransition,
    TimelineRead,
    TimelineAppend,
    ChatRead,
    ChatSend,
    ReviewRead,
    ReviewWrite,
    /// Compliance surfaces and arbitrary-filter listings.
    CaseAdminOverride,
}

/// The role table.  Anything not granted here is rejected before business
/// logic runs.
pub fn role_grants(role: Role, capability: Capability) -> bool {
    use Capability::*;

    match capability {
        // Owners create requests; admins administer existing ones but never
        // own them.
        CaseRequestCreate => matches!(role, Role::Customer | Role::Investigator),

        // Chat is strictly between the two case participants.  Admins read
        // for oversight but cannot send.
        ChatSend => matches!(role, Role::Customer | Role::Investigator),

        CaseAdminOverride => role.is_admin(),

        // Open to any authenticated role; object-level rules narrow access
        // per request.
        CaseRequestRead | CaseRequestEdit | CaseRequestDelete | CaseTransition
        | TimelineRead | TimelineAppend | ChatRead | ReviewRead | ReviewWrite => true,
    }
}
