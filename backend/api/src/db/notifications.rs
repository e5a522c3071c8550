//! Notification rows: inserts, inbox reads, read-state updates.

use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::errors::Result;
use crate::models::Notification;

/// Persist a notification and return the stored row.
pub async fn insert_notification(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
    title: &str,
    message: &str,
) -> Result<Notification> {
    let row = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, title, message, is_read, created_at)
        VALUES (?1, ?2, ?3, 0, ?4)
        RETURNING notification_id, user_id, title, message, is_read, created_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;
    Ok(row)
}

pub async fn find_notification(
    executor: impl SqliteExecutor<'_>,
    notification_id: i64,
) -> Result<Option<Notification>> {
    let row = sqlx::query_as::<_, Notification>(
        r#"
        SELECT notification_id, user_id, title, message, is_read, created_at
        FROM   notifications
        WHERE  notification_id = ?1
        "#,
    )
    .bind(notification_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// The newest `limit` notifications for a user.
pub async fn list_for_user(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT notification_id, user_id, title, message, is_read, created_at
        FROM   notifications
        WHERE  user_id = ?1
        ORDER  BY created_at DESC, notification_id DESC
        LIMIT  ?2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Unread notifications for a user, newest first.
pub async fn list_unread(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
) -> Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT notification_id, user_id, title, message, is_read, created_at
        FROM   notifications
        WHERE  user_id = ?1 AND is_read = 0
        ORDER  BY created_at DESC, notification_id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

pub async fn count_unread(executor: impl SqliteExecutor<'_>, user_id: i64) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0")
            .bind(user_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}

pub async fn mark_read(executor: impl SqliteExecutor<'_>, notification_id: i64) -> Result<()> {
    sqlx::query("UPDATE notifications SET is_read = 1 WHERE notification_id = ?1")
        .bind(notification_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Mark every unread notification of a user as read; returns how many changed.
pub async fn mark_all_read(executor: impl SqliteExecutor<'_>, user_id: i64) -> Result<u64> {
    let rows = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0")
        .bind(user_id)
        .execute(executor)
        .await?
        .rows_affected();
    Ok(rows)
}

pub async fn delete_notification(
    executor: impl SqliteExecutor<'_>,
    notification_id: i64,
) -> Result<()> {
    sqlx::query("DELETE FROM notifications WHERE notification_id = ?1")
        .bind(notification_id)
        .execute(executor)
        .await?;
    Ok(())
}
