//! Direct messages between users.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::{can_access, Principal};
use crate::db;
use crate::errors::{AppError, FieldError, Result};
use crate::models::{MessageDetails, MessageSummary};
use crate::push::PushChannel;

/// Body of `POST /api/messages`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Option<i64>,
    pub subject: Option<String>,
    pub content: Option<String>,
}

/// Send a message and notify its recipient.
pub async fn send(
    pool: &SqlitePool,
    push: &dyn PushChannel,
    principal: &Principal,
    request: SendMessageRequest,
) -> Result<i64> {
    let content = request.content.unwrap_or_default().trim().to_string();
    let receiver_id = match (request.receiver_id, content.is_empty()) {
        (Some(id), false) => id,
        (receiver_id, empty) => {
            let mut errors = Vec::new();
            if receiver_id.is_none() {
                errors.push(FieldError::new("receiverId", "Receiver ID is required"));
            }
            if empty {
                errors.push(FieldError::new("content", "Message content is required"));
            }
            return Err(AppError::Validation(errors));
        }
    };
    let subject = request
        .subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if db::users::find_user(pool, receiver_id).await?.is_none() {
        return Err(AppError::NotFound("Receiver not found".to_string()));
    }

    let mut tx = pool.begin().await?;
    let message_id = db::messages::insert_message(
        &mut *tx,
        principal.id,
        receiver_id,
        subject.as_deref(),
        &content,
    )
    .await?;
    let notification = db::notifications::insert_notification(
        &mut *tx,
        receiver_id,
        "New Message",
        &format!(
            "You have received a new message from {}",
            principal.display_name()
        ),
    )
    .await?;
    tx.commit().await?;

    push.deliver(receiver_id, &notification);
    info!("Message {message_id} sent from user {} to user {receiver_id}", principal.id);
    Ok(message_id)
}

pub async fn received(pool: &SqlitePool, principal: &Principal) -> Result<Vec<MessageSummary>> {
    db::messages::list_received(pool, principal.id).await
}

pub async fn sent(pool: &SqlitePool, principal: &Principal) -> Result<Vec<MessageSummary>> {
    db::messages::list_sent(pool, principal.id).await
}

/// Fetch one message. Opening an unread message as its receiver marks it read.
pub async fn get(pool: &SqlitePool, message_id: i64, principal: &Principal) -> Result<MessageDetails> {
    let mut details = db::messages::find_details(pool, message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;
    if !can_access(&details.message, principal) {
        return Err(AppError::Forbidden(
            "Not authorized to view this message".to_string(),
        ));
    }
    if principal.id == details.message.receiver_id && !details.message.is_read {
        db::messages::mark_read(pool, message_id).await?;
        details.message.is_read = true;
    }
    Ok(details)
}

pub async fn mark_read(pool: &SqlitePool, message_id: i64, principal: &Principal) -> Result<()> {
    let message = db::messages::find_message(pool, message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;
    if principal.id != message.receiver_id {
        return Err(AppError::Forbidden(
            "Not authorized to mark this message as read".to_string(),
        ));
    }
    db::messages::mark_read(pool, message_id).await
}

pub async fn delete(pool: &SqlitePool, message_id: i64, principal: &Principal) -> Result<()> {
    let message = db::messages::find_message(pool, message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;
    if !can_access(&message, principal) {
        return Err(AppError::Forbidden(
            "Not authorized to delete this message".to_string(),
        ));
    }
    db::messages::delete_message(pool, message_id).await
}

pub async fn unread_count(pool: &SqlitePool, principal: &Principal) -> Result<i64> {
    db::messages::count_unread(pool, principal.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::Role;
    use crate::push::PushHub;
    use crate::testing::cast;

    fn hello(receiver_id: i64) -> SendMessageRequest {
        SendMessageRequest {
            receiver_id: Some(receiver_id),
            subject: Some("Hello".into()),
            content: Some("How is school going?".into()),
        }
    }

    #[tokio::test]
    async fn send_notifies_the_recipient() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let hub = PushHub::new(8);
        let mut live = hub.subscribe();

        let id = send(&pool, &hub, &cast.sponsor, hello(cast.receiver.id))
            .await
            .unwrap();

        let pushed = live.recv().await.unwrap();
        assert_eq!(pushed.user_id, cast.receiver.id);
        assert_eq!(
            pushed.notification.message,
            "You have received a new message from Sam Sponsor"
        );

        let inbox = received(&pool, &cast.receiver).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].message.message_id, id);
        assert_eq!(inbox[0].counterpart_name, "Sam Sponsor");
        assert_eq!(inbox[0].counterpart_role, Role::Sponsor);

        let outbox = sent(&pool, &cast.sponsor).await.unwrap();
        assert_eq!(outbox[0].counterpart_name, "Rita Receiver");
        assert_eq!(unread_count(&pool, &cast.receiver).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn send_validates_before_lookup() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let hub = PushHub::new(8);

        match send(&pool, &hub, &cast.sponsor, Default::default()).await {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            send(&pool, &hub, &cast.sponsor, hello(777)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn receiver_opening_a_message_marks_it_read() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let hub = PushHub::new(8);
        let id = send(&pool, &hub, &cast.sponsor, hello(cast.receiver.id))
            .await
            .unwrap();

        let as_sender = get(&pool, id, &cast.sponsor).await.unwrap();
        assert!(!as_sender.message.is_read);

        let as_receiver = get(&pool, id, &cast.receiver).await.unwrap();
        assert!(as_receiver.message.is_read);
        assert_eq!(as_receiver.sender_role, Role::Sponsor);
        assert_eq!(as_receiver.receiver_name, "Rita Receiver");
        assert_eq!(unread_count(&pool, &cast.receiver).await.unwrap(), 0);

        assert!(matches!(
            get(&pool, id, &cast.outsider).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn only_receiver_marks_read_and_parties_delete() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let hub = PushHub::new(8);
        let id = send(&pool, &hub, &cast.sponsor, hello(cast.receiver.id))
            .await
            .unwrap();

        assert!(matches!(
            mark_read(&pool, id, &cast.sponsor).await,
            Err(AppError::Forbidden(_))
        ));
        mark_read(&pool, id, &cast.receiver).await.unwrap();

        assert!(matches!(
            delete(&pool, id, &cast.outsider).await,
            Err(AppError::Forbidden(_))
        ));
        delete(&pool, id, &cast.sponsor).await.unwrap();
        assert!(matches!(
            get(&pool, id, &cast.admin).await,
            Err(AppError::NotFound(_))
        ));
    }
}
