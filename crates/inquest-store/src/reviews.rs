//! Create/update operations for [`Review`] records and the provider
//! rating aggregate.
//!
//! The UNIQUE constraint on `reviews.request_id` is the one-review-per-case
//! guard; it holds across connections, so two racing writers cannot both
//! insert.  Every review write recomputes the provider's mean rating and
//! review count inside the same transaction, keeping the denormalized
//! columns exact.

use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use uuid::Uuid;

use crate::convert;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Review;

/// A review about to be created.
#[derive(Debug, Clone)]
pub struct NewReview {
    /// The completed case request being reviewed.
    pub request_id: Uuid,
    /// The provider the rating counts against.
    pub provider_id: Uuid,
    /// The request owner, credited as reviewer regardless of submitter.
    pub customer_id: Uuid,
    /// Star rating, 1 through 5.
    pub rating: i32,
    /// Optional free-text comment.
    pub comment: Option<String>,
}

/// Recompute a provider's mean rating and review count from scratch on the
/// caller's connection.  Exact mean over all surviving reviews; resets to
/// zero when none remain.
pub(crate) fn recompute_provider_rating_tx(conn: &Connection, provider_id: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE providers SET
             rating = COALESCE((SELECT AVG(rating) FROM reviews WHERE provider_id = ?1), 0),
             review_count = (SELECT COUNT(*) FROM reviews WHERE provider_id = ?1)
         WHERE id = ?1",
        params![provider_id.to_string()],
    )?;
    Ok(())
}

impl Database {
    /// Insert a review and refresh the provider aggregate in one
    /// transaction.  A second review for the same request fails with
    /// [`StoreError::Duplicate`].
    pub fn create_review(&mut self, new: &NewReview) -> Result<Review> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO reviews (id, request_id, provider_id, customer_id, rating, comment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                new.request_id.to_string(),
                new.provider_id.to_string(),
                new.customer_id.to_string(),
                new.rating,
                new.comment,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::on_insert(e, "review"))?;

        recompute_provider_rating_tx(&tx, new.provider_id)?;
        tx.commit()?;

        Ok(Review {
            id,
            request_id: new.request_id,
            provider_id: new.provider_id,
            customer_id: new.customer_id,
            rating: new.rating,
            comment: new.comment.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Update a review's rating and/or comment and refresh the provider
    /// aggregate in one transaction.  Absent fields are left unchanged.
    pub fn update_review(
        &mut self,
        request_id: Uuid,
        rating: Option<i32>,
        comment: Option<String>,
    ) -> Result<Review> {
        let now = Utc::now();
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let touched = tx.execute(
            "UPDATE reviews SET
                 rating = COALESCE(?2, rating),
                 comment = COALESCE(?3, comment),
                 updated_at = ?4
             WHERE request_id = ?1",
            params![request_id.to_string(), rating, comment, now.to_rfc3339()],
        )?;
        if touched == 0 {
            return Err(StoreError::NotFound);
        }

        let review = tx.query_row(
            "SELECT id, request_id, provider_id, customer_id, rating, comment, created_at, updated_at
             FROM reviews
             WHERE request_id = ?1",
            params![request_id.to_string()],
            row_to_review,
        )?;

        recompute_provider_rating_tx(&tx, review.provider_id)?;
        tx.commit()?;
        Ok(review)
    }

    /// Fetch the review attached to a case request.
    pub fn get_review(&self, request_id: Uuid) -> Result<Review> {
        self.conn()
            .query_row(
                "SELECT id, request_id, provider_id, customer_id, rating, comment, created_at, updated_at
                 FROM reviews
                 WHERE request_id = ?1",
                params![request_id.to_string()],
                row_to_review,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Review`].
fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: convert::uuid_col(row, 0)?,
        request_id: convert::uuid_col(row, 1)?,
        provider_id: convert::uuid_col(row, 2)?,
        customer_id: convert::uuid_col(row, 3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: convert::ts_col(row, 6)?,
        updated_at: convert::ts_col(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use inquest_shared::Role;
    use uuid::Uuid;

    use super::NewReview;
    use crate::database::Database;
    use crate::error::StoreError;
    use crate::models::ProviderStatus;
    use crate::testutil;

    fn review_for(request_id: Uuid, provider_id: Uuid, customer_id: Uuid, rating: i32) -> NewReview {
        NewReview {
            request_id,
            provider_id,
            customer_id,
            rating,
            comment: None,
        }
    }

    #[test]
    fn aggregate_is_exact_mean_over_all_reviews() {
        let (_dir, mut db) = testutil::open_test_db();
        let customer = testutil::seed_user(&db, Role::Customer, "Dana");
        let provider = testutil::seed_provider(&db, ProviderStatus::Approved);
        let first = testutil::seed_request(&mut db, customer.id, provider.id);
        let second = testutil::seed_request(&mut db, customer.id, provider.id);

        db.create_review(&review_for(first.id, provider.id, customer.id, 5))
            .unwrap();
        let after_one = db.get_provider(provider.id).unwrap();
        assert!((after_one.rating - 5.0).abs() < f64::EPSILON);
        assert_eq!(after_one.review_count, 1);

        db.create_review(&review_for(second.id, provider.id, customer.id, 2))
            .unwrap();
        let after_two = db.get_provider(provider.id).unwrap();
        assert!((after_two.rating - 3.5).abs() < f64::EPSILON);
        assert_eq!(after_two.review_count, 2);
    }

    #[test]
    fn second_review_for_same_request_is_duplicate() {
        let (_dir, mut db) = testutil::open_test_db();
        let customer = testutil::seed_user(&db, Role::Customer, "Dana");
        let provider = testutil::seed_provider(&db, ProviderStatus::Approved);
        let request = testutil::seed_request(&mut db, customer.id, provider.id);

        db.create_review(&review_for(request.id, provider.id, customer.id, 4))
            .unwrap();
        let err = db
            .create_review(&review_for(request.id, provider.id, customer.id, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // The failed insert must not have skewed the aggregate.
        let provider = db.get_provider(provider.id).unwrap();
        assert!((provider.rating - 4.0).abs() < f64::EPSILON);
        assert_eq!(provider.review_count, 1);
    }

    #[test]
    fn update_recomputes_aggregate() {
        let (_dir, mut db) = testutil::open_test_db();
        let customer = testutil::seed_user(&db, Role::Customer, "Dana");
        let provider = testutil::seed_provider(&db, ProviderStatus::Approved);
        let request = testutil::seed_request(&mut db, customer.id, provider.id);

        db.create_review(&review_for(request.id, provider.id, customer.id, 5))
            .unwrap();
        let updated = db
            .update_review(request.id, Some(1), Some("changed my mind".into()))
            .unwrap();
        assert_eq!(updated.rating, 1);
        assert_eq!(updated.comment.as_deref(), Some("changed my mind"));

        let provider = db.get_provider(provider.id).unwrap();
        assert!((provider.rating - 1.0).abs() < f64::EPSILON);
        assert_eq!(provider.review_count, 1);
    }

    #[test]
    fn update_missing_review_is_not_found() {
        let (_dir, mut db) = testutil::open_test_db();
        let err = db.update_review(Uuid::new_v4(), Some(3), None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn racing_writers_leave_exactly_one_review() {
        let (dir, mut db) = testutil::open_test_db();
        let customer = testutil::seed_user(&db, Role::Customer, "Dana");
        let provider = testutil::seed_provider(&db, ProviderStatus::Approved);
        let request = testutil::seed_request(&mut db, customer.id, provider.id);
        let path = dir.path().join("test.db");

        let mut handles = Vec::new();
        for rating in [5, 1] {
            let path = path.clone();
            let new = review_for(request.id, provider.id, customer.id, rating);
            handles.push(std::thread::spawn(move || {
                let mut db = Database::open_at(&path).expect("open second handle");
                db.create_review(&new)
            }));
        }

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("writer thread"))
            .collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(StoreError::Duplicate(_)))));

        let provider = db.get_provider(provider.id).unwrap();
        assert_eq!(provider.review_count, 1);
        let surviving = db.get_review(request.id).unwrap();
        assert!((provider.rating - f64::from(surviving.rating)).abs() < f64::EPSILON);
    }
}
