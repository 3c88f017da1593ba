//! Best-effort notification fan-out.
//!
//! Every function here runs after the primary operation has committed and
//! only writes outbox rows.  Failures are logged and swallowed; a lost
//! notification must never fail the request that triggered it.

use inquest_shared::NotificationKind;
use inquest_store::{CaseRequest, Database, NewNotification};
use uuid::Uuid;

fn deliver(db: &Database, new: NewNotification) {
    if let Err(err) = db.insert_notification(&new) {
        tracing::warn!(user = %new.user_id, kind = %new.kind, error = %err,
            "failed to write notification");
    }
}

/// Tell the provider's user account about a freshly created case request.
pub fn case_assigned(db: &Database, request: &CaseRequest, provider_user_id: Uuid) {
    deliver(
        db,
        NewNotification {
            user_id: provider_user_id,
            kind: NotificationKind::CaseAssigned,
            title: "New case request".to_string(),
            message: format!("You have a new case request: {}", request.title),
            request_id: Some(request.id),
            metadata: None,
        },
    );
}

/// Tell every participant except the actor that the status moved.
pub fn status_changed(db: &Database, request: &CaseRequest, actor_id: Uuid, from_status: &str) {
    let provider_user_id = match db.find_provider(request.provider_id) {
        Ok(provider) => provider.map(|p| p.user_id),
        Err(err) => {
            tracing::warn!(provider = %request.provider_id, error = %err,
                "could not resolve provider for status notification");
            None
        }
    };

    let mut message = format!(
        "\"{}\" moved from {} to {}",
        request.title, from_status, request.status
    );
    if request.status == inquest_shared::CaseStatus::Declined {
        if let Some(reason) = &request.decline_reason {
            message.push_str(&format!(": {reason}"));
        }
    }

    let metadata = serde_json::json!({
        "from": from_status,
        "to": request.status.to_string(),
    });

    for recipient in [Some(request.customer_id), provider_user_id]
        .into_iter()
        .flatten()
    {
        if recipient == actor_id {
            continue;
        }
        deliver(
            db,
            NewNotification {
                user_id: recipient,
                kind: NotificationKind::CaseStatusChanged,
                title: "Case status updated".to_string(),
                message: message.clone(),
                request_id: Some(request.id),
                metadata: Some(metadata.clone()),
            },
        );
    }
}

/// Tell the other chat participant a message arrived.
pub fn chat_message(db: &Database, request_id: Uuid, room_id: Uuid, recipient: Uuid, preview: &str) {
    deliver(
        db,
        NewNotification {
            user_id: recipient,
            kind: NotificationKind::ChatMessage,
            title: "New message".to_string(),
            message: preview.to_string(),
            request_id: Some(request_id),
            metadata: Some(serde_json::json!({ "room_id": room_id.to_string() })),
        },
    );
}

/// Tell the provider's user account a review landed on their case.
pub fn review_submitted(db: &Database, request: &CaseRequest, rating: i32) {
    let provider_user_id = match db.find_provider(request.provider_id) {
        Ok(Some(provider)) => provider.user_id,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(provider = %request.provider_id, error = %err,
                "could not resolve provider for review notification");
            return;
        }
    };

    deliver(
        db,
        NewNotification {
            user_id: provider_user_id,
            kind: NotificationKind::ReviewSubmitted,
            title: "New review".to_string(),
            message: format!(
                "You received a {rating}-star review for \"{}\"",
                request.title
            ),
            request_id: Some(request.id),
            metadata: Some(serde_json::json!({ "rating": rating })),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use inquest_shared::CaseStatus;

    #[test]
    fn status_change_skips_the_actor() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = testutil::CaseFixture::create(&mut db);

        // Customer moved the status; only the provider's user should hear.
        status_changed(&db, &fixture.request, fixture.customer.id, "MATCHING");

        assert!(db
            .list_notifications_for_user(fixture.customer.id)
            .unwrap()
            .is_empty());
        let for_provider = db
            .list_notifications_for_user(fixture.provider.user_id)
            .unwrap();
        assert_eq!(for_provider.len(), 1);
        assert_eq!(for_provider[0].kind, NotificationKind::CaseStatusChanged);
        assert_eq!(for_provider[0].request_id, Some(fixture.request.id));
    }

    #[test]
    fn admin_driven_change_reaches_both_participants() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = testutil::CaseFixture::create(&mut db);
        let admin_id = uuid::Uuid::new_v4();

        status_changed(&db, &fixture.request, admin_id, "MATCHING");

        assert_eq!(
            db.list_notifications_for_user(fixture.customer.id)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            db.list_notifications_for_user(fixture.provider.user_id)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn decline_reason_rides_in_the_message() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = testutil::CaseFixture::create(&mut db);

        let mut declined = fixture.request.clone();
        declined.status = CaseStatus::Declined;
        declined.decline_reason = Some("Out of my coverage area".to_string());

        status_changed(&db, &declined, fixture.provider.user_id, "MATCHING");

        let for_customer = db
            .list_notifications_for_user(fixture.customer.id)
            .unwrap();
        assert_eq!(for_customer.len(), 1);
        assert!(for_customer[0].message.contains("Out of my coverage area"));
    }
}
