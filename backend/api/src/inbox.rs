//! Per-user notification inbox.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::Principal;
use crate::db;
use crate::errors::{AppError, FieldError, Result};
use crate::models::Notification;
use crate::push::PushChannel;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Body of `POST /api/notifications`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub message: Option<String>,
}

/// The principal's notifications, newest first. `unread_only` skips read ones.
pub async fn list(
    pool: &SqlitePool,
    principal: &Principal,
    limit: Option<i64>,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    if unread_only {
        return db::notifications::list_unread(pool, principal.id).await;
    }
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    db::notifications::list_for_user(pool, principal.id, limit).await
}

pub async fn unread_count(pool: &SqlitePool, principal: &Principal) -> Result<i64> {
    db::notifications::count_unread(pool, principal.id).await
}

pub async fn mark_read(pool: &SqlitePool, notification_id: i64, principal: &Principal) -> Result<()> {
    let notification = db::notifications::find_notification(pool, notification_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;
    if notification.user_id != principal.id {
        return Err(AppError::Forbidden(
            "Not authorized to update this notification".to_string(),
        ));
    }
    db::notifications::mark_read(pool, notification_id).await
}

pub async fn mark_all_read(pool: &SqlitePool, principal: &Principal) -> Result<u64> {
    db::notifications::mark_all_read(pool, principal.id).await
}

/// Admin-authored notification to any user; persisted, then pushed.
pub async fn create(
    pool: &SqlitePool,
    push: &dyn PushChannel,
    principal: &Principal,
    request: CreateNotificationRequest,
) -> Result<Notification> {
    let mut errors = Vec::new();
    if request.user_id.is_none() {
        errors.push(FieldError::new("userId", "User ID is required"));
    }
    let title = request.title.unwrap_or_default().trim().to_string();
    if title.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    }
    let message = request.message.unwrap_or_default().trim().to_string();
    if message.is_empty() {
        errors.push(FieldError::new("message", "Message is required"));
    }
    let user_id = match request.user_id {
        Some(id) if errors.is_empty() => id,
        _ => return Err(AppError::Validation(errors)),
    };

    if !principal.is_admin() {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }
    if db::users::find_user(pool, user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let notification =
        db::notifications::insert_notification(pool, user_id, &title, &message).await?;
    push.deliver(user_id, &notification);
    info!(
        "Notification {} sent to user {user_id} by admin {}",
        notification.notification_id, principal.id
    );
    Ok(notification)
}

pub async fn delete(pool: &SqlitePool, notification_id: i64, principal: &Principal) -> Result<()> {
    let notification = db::notifications::find_notification(pool, notification_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;
    if notification.user_id != principal.id && !principal.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to delete this notification".to_string(),
        ));
    }
    db::notifications::delete_notification(pool, notification_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::push::PushHub;
    use crate::testing::cast;

    fn request(user_id: i64) -> CreateNotificationRequest {
        CreateNotificationRequest {
            user_id: Some(user_id),
            title: Some("Welcome".into()),
            message: Some("Glad to have you".into()),
        }
    }

    #[tokio::test]
    async fn admin_broadcast_is_persisted_and_pushed() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let hub = PushHub::new(8);
        let mut live = hub.subscribe();

        let created = create(&pool, &hub, &cast.admin, request(cast.receiver.id))
            .await
            .unwrap();
        assert!(!created.is_read);
        assert_eq!(live.recv().await.unwrap().notification, created);
        assert_eq!(unread_count(&pool, &cast.receiver).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_is_admin_only_and_validated() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let hub = PushHub::new(8);

        assert!(matches!(
            create(&pool, &hub, &cast.sponsor, request(cast.receiver.id)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            create(&pool, &hub, &cast.admin, request(4_040)).await,
            Err(AppError::NotFound(_))
        ));
        match create(&pool, &hub, &cast.admin, Default::default()).await {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_state_is_owner_only() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let hub = PushHub::new(8);
        let first = create(&pool, &hub, &cast.admin, request(cast.receiver.id))
            .await
            .unwrap();
        create(&pool, &hub, &cast.admin, request(cast.receiver.id))
            .await
            .unwrap();

        assert!(matches!(
            mark_read(&pool, first.notification_id, &cast.sponsor).await,
            Err(AppError::Forbidden(_))
        ));
        mark_read(&pool, first.notification_id, &cast.receiver)
            .await
            .unwrap();
        assert_eq!(unread_count(&pool, &cast.receiver).await.unwrap(), 1);
        assert_eq!(list(&pool, &cast.receiver, None, true).await.unwrap().len(), 1);
        assert_eq!(list(&pool, &cast.receiver, None, false).await.unwrap().len(), 2);
        assert_eq!(list(&pool, &cast.receiver, Some(1), false).await.unwrap().len(), 1);

        assert_eq!(mark_all_read(&pool, &cast.receiver).await.unwrap(), 1);
        assert_eq!(unread_count(&pool, &cast.receiver).await.unwrap(), 0);

        assert!(matches!(
            mark_read(&pool, 9_999, &cast.receiver).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_by_owner_or_admin() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let hub = PushHub::new(8);
        let a = create(&pool, &hub, &cast.admin, request(cast.receiver.id))
            .await
            .unwrap();
        let b = create(&pool, &hub, &cast.admin, request(cast.receiver.id))
            .await
            .unwrap();

        assert!(matches!(
            delete(&pool, a.notification_id, &cast.outsider).await,
            Err(AppError::Forbidden(_))
        ));
        delete(&pool, a.notification_id, &cast.receiver).await.unwrap();
        delete(&pool, b.notification_id, &cast.admin).await.unwrap();
        assert!(list(&pool, &cast.receiver, None, false).await.unwrap().is_empty());
    }
}
