//! API error type and its HTTP mapping.
//!
//! Every business rule violation has its own variant with a stable machine
//! code; the JSON body is always `{"code": ..., "message": ...}`.  Internal
//! failures are logged server-side and surface as a generic 500 without
//! detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inquest_shared::CaseStatus;
use inquest_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid identity headers")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Only the case participants may send messages")]
    NotParticipant,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unrecognized case status: {0}")]
    InvalidStatus(String),

    #[error("Declining requires a non-empty reason")]
    MissingDeclineReason,

    #[error("Case request not found")]
    RequestNotFound,

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Scenario template not found")]
    ScenarioNotFound,

    #[error("No review exists for this case request")]
    ReviewNotFound,

    #[error("Chat room not found")]
    ChatNotFound,

    #[error("Provider is not accepting new case requests")]
    ProviderNotAvailable,

    #[error("Case request is already {0}")]
    StatusUnchanged(CaseStatus),

    #[error("Transition from {from} to {to} is not allowed")]
    TransitionNotAllowed { from: CaseStatus, to: CaseStatus },

    #[error("A review already exists for this case request")]
    DuplicateReview,

    #[error("Reviews are only accepted for completed case requests")]
    ReviewNotAllowed,

    #[error("Chat is not available for this case request")]
    ChannelNotAvailable,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable code for the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotParticipant => "not_participant",
            ApiError::Validation(_) => "validation_failed",
            ApiError::InvalidStatus(_) => "invalid_status",
            ApiError::MissingDeclineReason => "missing_decline_reason",
            ApiError::RequestNotFound => "request_not_found",
            ApiError::ProviderNotFound => "provider_not_found",
            ApiError::ScenarioNotFound => "scenario_not_found",
            ApiError::ReviewNotFound => "review_not_found",
            ApiError::ChatNotFound => "chat_not_found",
            ApiError::ProviderNotAvailable => "provider_not_available",
            ApiError::StatusUnchanged(_) => "status_unchanged",
            ApiError::TransitionNotAllowed { .. } => "transition_not_allowed",
            ApiError::DuplicateReview => "duplicate_review",
            ApiError::ReviewNotAllowed => "review_not_allowed",
            ApiError::ChannelNotAvailable => "channel_not_available",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidStatus(_)
            | ApiError::MissingDeclineReason => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::NotParticipant => StatusCode::FORBIDDEN,
            ApiError::RequestNotFound
            | ApiError::ProviderNotFound
            | ApiError::ScenarioNotFound
            | ApiError::ReviewNotFound
            | ApiError::ChatNotFound => StatusCode::NOT_FOUND,
            ApiError::ProviderNotAvailable
            | ApiError::StatusUnchanged(_)
            | ApiError::TransitionNotAllowed { .. }
            | ApiError::DuplicateReview
            | ApiError::ReviewNotAllowed
            | ApiError::ChannelNotAvailable
            | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Never leak internals to the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "code": self.code(),
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Default store-error mapping.  Call sites that know better (a review
/// lookup, a chat room lookup) map explicitly before `?` reaches this.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::RequestNotFound,
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Duplicate(what) => ApiError::Conflict(format!("Duplicate {what}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_classes() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotParticipant.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidStatus("PAUSED".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::RequestNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::StatusUnchanged(CaseStatus::Matching).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::TransitionNotAllowed {
                from: CaseStatus::Accepted,
                to: CaseStatus::Declined,
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::DuplicateReview.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_not_found_defaults_to_request_not_found() {
        let err: ApiError = StoreError::NotFound.into();
        assert!(matches!(err, ApiError::RequestNotFound));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ApiError::MissingDeclineReason.code(), "missing_decline_reason");
        assert_eq!(ApiError::ProviderNotAvailable.code(), "provider_not_available");
        assert_eq!(ApiError::ChannelNotAvailable.code(), "channel_not_available");
        assert_eq!(ApiError::ReviewNotAllowed.code(), "review_not_allowed");
    }
}
