//! The per-case chat channel: lazy room creation, reads, and sends.
//!
//! The room is created on first access by whichever participant arrives
//! first.  Admins may read for oversight; sending is strictly between the
//! owner and the assigned provider's user account.

use inquest_shared::Capability;
use inquest_store::chat::CHAT_PREVIEW_CAP;
use inquest_store::{
    CaseRequest, ChatAttachment, ChatMessage, ChatRoom, Database, NewChatMessage, StoreError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{self, Identity};
use crate::error::ApiError;
use crate::notify;
use crate::requests::load_case_access;

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageBody {
    pub content: String,
    pub attachments: Option<Vec<ChatAttachment>>,
}

/// Public identity of one side of the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatParticipant {
    pub user_id: Uuid,
    pub display_name: Option<String>,
}

/// Everything a client needs to render the conversation.
#[derive(Debug, Serialize)]
pub struct ChatView {
    pub room: ChatRoom,
    pub participants: Vec<ChatParticipant>,
    pub messages: Vec<ChatMessage>,
}

/// Resolve the user account behind the assigned provider.  Without it there
/// is no second participant and the channel cannot exist.
fn resolve_provider_user(db: &Database, request: &CaseRequest) -> Result<Uuid, ApiError> {
    match db.find_provider(request.provider_id)? {
        Some(provider) => Ok(provider.user_id),
        None => Err(ApiError::ChannelNotAvailable),
    }
}

/// Look up a display name without letting a directory miss break the read.
fn participant(db: &Database, user_id: Uuid) -> ChatParticipant {
    let display_name = match db.find_user(user_id) {
        Ok(Some(user)) => user.display_name,
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(user = %user_id, error = %err, "could not resolve chat participant");
            None
        }
    };
    ChatParticipant {
        user_id,
        display_name,
    }
}

pub fn read(db: &Database, identity: &Identity, request_id: Uuid) -> Result<ChatView, ApiError> {
    auth::require(identity, Capability::ChatRead)?;

    let access = load_case_access(db, identity, request_id)?;
    if !access.can_view() {
        return Err(ApiError::Forbidden(
            "Only the case participants or an administrator may read this conversation"
                .to_string(),
        ));
    }

    let provider_user_id = resolve_provider_user(db, &access.request)?;
    let room =
        db.get_or_create_chat_room(request_id, access.request.customer_id, provider_user_id)?;
    let messages = db.list_chat_messages(room.id)?;
    let participants = vec![
        participant(db, access.request.customer_id),
        participant(db, provider_user_id),
    ];

    Ok(ChatView {
        room,
        participants,
        messages,
    })
}

pub fn send(
    db: &mut Database,
    identity: &Identity,
    request_id: Uuid,
    body: SendMessageBody,
) -> Result<ChatMessage, ApiError> {
    auth::require(identity, Capability::ChatSend)?;

    let access = load_case_access(db, identity, request_id)?;
    if !access.is_participant() {
        return Err(ApiError::NotParticipant);
    }

    let content = body.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation(
            "message content may not be empty".to_string(),
        ));
    }

    let provider_user_id = resolve_provider_user(db, &access.request)?;
    let room =
        db.get_or_create_chat_room(request_id, access.request.customer_id, provider_user_id)?;

    let message = db
        .append_chat_message(&NewChatMessage {
            room_id: room.id,
            sender_id: identity.user_id,
            content,
            attachments: body.attachments.unwrap_or_default(),
        })
        .map_err(|err| match err {
            // The room vanished between get-or-create and the append.
            StoreError::NotFound => ApiError::ChatNotFound,
            other => ApiError::from(other),
        })?;

    let recipient = if identity.user_id == access.request.customer_id {
        provider_user_id
    } else {
        access.request.customer_id
    };
    let preview: String = message.content.chars().take(CHAT_PREVIEW_CAP).collect();
    notify::chat_message(db, request_id, room.id, recipient, &preview);

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, CaseFixture};
    use inquest_shared::{NotificationKind, Role};

    #[test]
    fn first_read_creates_the_room_and_later_reads_reuse_it() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = CaseFixture::create(&mut db);
        let owner = testutil::identity(fixture.customer.id, Role::Customer);
        let provider = testutil::identity(fixture.provider.user_id, Role::Investigator);

        let first = read(&db, &owner, fixture.request.id).unwrap();
        assert!(first.messages.is_empty());
        assert_eq!(first.room.customer_id, fixture.customer.id);
        assert_eq!(first.room.provider_user_id, fixture.provider.user_id);

        let second = read(&db, &provider, fixture.request.id).unwrap();
        assert_eq!(second.room.id, first.room.id);

        let names: Vec<Option<String>> = second
            .participants
            .iter()
            .map(|p| p.display_name.clone())
            .collect();
        assert!(names.contains(&Some("Avery Quinn".to_string())));
        assert!(names.contains(&Some("Sam Marlowe".to_string())));
    }

    #[test]
    fn conversation_round_trip_notifies_the_other_side() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = CaseFixture::create(&mut db);
        let owner = testutil::identity(fixture.customer.id, Role::Customer);
        let provider = testutil::identity(fixture.provider.user_id, Role::Investigator);

        send(
            &mut db,
            &owner,
            fixture.request.id,
            SendMessageBody {
                content: "Any progress on the ledger?".to_string(),
                attachments: None,
            },
        )
        .unwrap();
        send(
            &mut db,
            &provider,
            fixture.request.id,
            SendMessageBody {
                content: "Visiting the records office tomorrow.".to_string(),
                attachments: Some(vec![ChatAttachment {
                    file_name: "warrant.pdf".to_string(),
                    url: "https://files.example/warrant.pdf".to_string(),
                }]),
            },
        )
        .unwrap();

        let view = read(&db, &owner, fixture.request.id).unwrap();
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[0].content, "Any progress on the ledger?");
        assert_eq!(view.messages[1].attachments.len(), 1);
        assert_eq!(
            view.room.last_message.as_deref(),
            Some("Visiting the records office tomorrow.")
        );

        let provider_heard = db
            .list_notifications_for_user(fixture.provider.user_id)
            .unwrap();
        assert!(provider_heard
            .iter()
            .any(|n| n.kind == NotificationKind::ChatMessage
                && n.message == "Any progress on the ledger?"));

        let owner_heard = db
            .list_notifications_for_user(fixture.customer.id)
            .unwrap();
        assert!(owner_heard
            .iter()
            .any(|n| n.kind == NotificationKind::ChatMessage));
    }

    #[test]
    fn admins_read_but_never_send() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = CaseFixture::create(&mut db);
        let admin = testutil::identity(Uuid::new_v4(), Role::Admin);

        assert!(read(&db, &admin, fixture.request.id).is_ok());

        let err = send(
            &mut db,
            &admin,
            fixture.request.id,
            SendMessageBody {
                content: "joining in".to_string(),
                attachments: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn outside_customers_are_not_participants() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = CaseFixture::create(&mut db);
        let stranger = testutil::identity(Uuid::new_v4(), Role::Customer);

        let err = send(
            &mut db,
            &stranger,
            fixture.request.id,
            SendMessageBody {
                content: "let me in".to_string(),
                attachments: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::NotParticipant));
    }

    #[test]
    fn blank_messages_are_rejected() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = CaseFixture::create(&mut db);
        let owner = testutil::identity(fixture.customer.id, Role::Customer);

        let err = send(
            &mut db,
            &owner,
            fixture.request.id,
            SendMessageBody {
                content: "   \n  ".to_string(),
                attachments: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn missing_provider_profile_means_no_channel() {
        let (_dir, mut db) = testutil::test_db();
        let fixture = CaseFixture::create(&mut db);
        let owner = testutil::identity(fixture.customer.id, Role::Customer);

        // Simulate a directory row lost after assignment.  The dangling
        // reference needs enforcement off for the duration of the write.
        db.conn().pragma_update(None, "foreign_keys", "OFF").unwrap();
        db.conn()
            .execute(
                "UPDATE case_requests SET provider_id = ?1 WHERE id = ?2",
                [Uuid::new_v4().to_string(), fixture.request.id.to_string()],
            )
            .unwrap();
        db.conn().pragma_update(None, "foreign_keys", "ON").unwrap();

        let err = read(&db, &owner, fixture.request.id).unwrap_err();
        assert!(matches!(err, ApiError::ChannelNotAvailable));
    }
}
