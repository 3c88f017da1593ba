//! Review operations and the provider rating aggregate.
//!
//! One review per case request, accepted only once the case is completed.
//! The review always rates the assigned provider on behalf of the owner,
//! regardless of which allowed actor submits it.

use inquest_shared::{Capability, CaseStatus};
use inquest_store::{Database, NewReview, Review, StoreError};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::error::ApiError;
use crate::notify;
use crate::requests::{clean, load_case_access};

/// Longest accepted review comment, in characters.
pub const COMMENT_CAP: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewBody {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewBody {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

fn validate_rating(rating: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

fn validate_comment(comment: &Option<String>) -> Result<(), ApiError> {
    if let Some(comment) = comment {
        if comment.chars().count() > COMMENT_CAP {
            return Err(ApiError::Validation(format!(
                "comment may not exceed {COMMENT_CAP} characters"
            )));
        }
    }
    Ok(())
}

pub fn create(
    db: &mut Database,
    identity: &Identity,
    request_id: Uuid,
    body: CreateReviewBody,
) -> Result<Review, ApiError> {
    auth::require(identity, Capability::ReviewWrite)?;

    let access = load_case_access(db, identity, request_id)?;
    if !access.can_view() {
        return Err(ApiError::Forbidden(
            "Only the case participants or an administrator may review this case".to_string(),
        ));
    }
    if access.request.status != CaseStatus::Completed {
        return Err(ApiError::ReviewNotAllowed);
    }

    validate_rating(body.rating)?;
    let comment = clean(body.comment);
    validate_comment(&comment)?;

    let review = db
        .create_review(&NewReview {
            request_id,
            provider_id: access.request.provider_id,
            customer_id: access.request.customer_id,
            rating: body.rating,
            comment,
        })
        .map_err(|err| match err {
            StoreError::Duplicate(_) => ApiError::DuplicateReview,
            other => ApiError::from(other),
        })?;

    notify::review_submitted(db, &access.request, review.rating);

    Ok(review)
}

pub fn update(
    db: &mut Database,
    identity: &Identity,
    request_id: Uuid,
    body: UpdateReviewBody,
) -> Result<Review, ApiError> {
    auth::require(identity, Capability::ReviewWrite)?;

    let access = load_case_access(db, identity, request_id)?;
    if !access.can_view() {
        return Err(ApiError::Forbidden(
            "Only the case participants or an administrator may edit this review".to_string(),
        ));
    }

    if let Some(rating) = body.rating {
        validate_rating(rating)?;
    }
    let comment = clean(body.comment);
    validate_comment(&comment)?;
    if body.rating.is_none() && comment.is_none() {
        return Err(ApiError::Validation("no fields to update".to_string()));
    }

    let review = db
        .update_review(request_id, body.rating, comment)
        .map_err(|err| match err {
            StoreError::NotFound => ApiError::ReviewNotFound,
            other => ApiError::from(other),
        })?;

    notify::review_submitted(db, &access.request, review.rating);

    Ok(review)
}

pub fn get(db: &Database, identity: &Identity, request_id: Uuid) -> Result<Review, ApiError> {
    auth::require(identity, Capability::ReviewRead)?;

    let access = load_case_access(db, identity, request_id)?;
    if !access.can_view() {
        return Err(ApiError::Forbidden(
            "Only the case participants or an administrator may read this review".to_string(),
        ));
    }

    db.get_review(request_id).map_err(|err| match err {
        StoreError::NotFound => ApiError::ReviewNotFound,
        other => ApiError::from(other),
    })
}
