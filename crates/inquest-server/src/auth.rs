//! Caller identity and capability checks.
//!
//! The API trusts an upstream gateway to authenticate users and forward the
//! result as `x-user-id` / `x-user-role` headers.  Handlers resolve those
//! into an [`Identity`] and gate operations on capabilities.

use axum::http::HeaderMap;
use inquest_shared::{role_grants, Capability, Role};
use uuid::Uuid;

use crate::error::ApiError;

/// Resolved caller identity for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Extract the caller identity from the forwarded headers.
///
/// A missing or malformed header is treated as unauthenticated rather than
/// distinguishing the failure modes to the client.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, ApiError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or(ApiError::Unauthenticated)?;

    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<Role>().ok())
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Identity { user_id, role })
}

/// Require a capability, naming it in the rejection.
pub fn require(identity: &Identity, capability: Capability) -> Result<(), ApiError> {
    if role_grants(identity.role, capability) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "{} role lacks the {:?} capability",
            identity.role, capability
        )))
    }
}
