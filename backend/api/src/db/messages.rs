//! Direct messages between users.

use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::errors::Result;
use crate::models::{Message, MessageDetails, MessageSummary};

pub async fn insert_message(
    executor: impl SqliteExecutor<'_>,
    sender_id: i64,
    receiver_id: i64,
    subject: Option<&str>,
    content: &str,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO messages (sender_id, receiver_id, subject, content, is_read, created_at)
        VALUES (?1, ?2, ?3, ?4, 0, ?5)
        "#,
    )
    .bind(sender_id)
    .bind(receiver_id)
    .bind(subject)
    .bind(content)
    .bind(Utc::now())
    .execute(executor)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn find_message(
    executor: impl SqliteExecutor<'_>,
    message_id: i64,
) -> Result<Option<Message>> {
    let row = sqlx::query_as::<_, Message>(
        r#"
        SELECT message_id, sender_id, receiver_id, subject, content, is_read, created_at
        FROM   messages
        WHERE  message_id = ?1
        "#,
    )
    .bind(message_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

pub async fn find_details(
    executor: impl SqliteExecutor<'_>,
    message_id: i64,
) -> Result<Option<MessageDetails>> {
    let row = sqlx::query_as::<_, MessageDetails>(
        r#"
        SELECT m.message_id, m.sender_id, m.receiver_id, m.subject, m.content,
               m.is_read, m.created_at,
               s.first_name || ' ' || s.last_name AS sender_name,
               s.role AS sender_role,
               r.first_name || ' ' || r.last_name AS receiver_name,
               r.role AS receiver_role
        FROM   messages m
        JOIN   users s ON m.sender_id = s.user_id
        JOIN   users r ON m.receiver_id = r.user_id
        WHERE  m.message_id = ?1
        "#,
    )
    .bind(message_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// Inbox of `user_id`, newest first, named after each sender.
pub async fn list_received(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
) -> Result<Vec<MessageSummary>> {
    let rows = sqlx::query_as::<_, MessageSummary>(
        r#"
        SELECT m.message_id, m.sender_id, m.receiver_id, m.subject, m.content,
               m.is_read, m.created_at,
               u.first_name || ' ' || u.last_name AS counterpart_name,
               u.role AS counterpart_role
        FROM   messages m
        JOIN   users u ON m.sender_id = u.user_id
        WHERE  m.receiver_id = ?1
        ORDER  BY m.created_at DESC, m.message_id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Outbox of `user_id`, newest first, named after each recipient.
pub async fn list_sent(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
) -> Result<Vec<MessageSummary>> {
    let rows = sqlx::query_as::<_, MessageSummary>(
        r#"
        SELECT m.message_id, m.sender_id, m.receiver_id, m.subject, m.content,
               m.is_read, m.created_at,
               u.first_name || ' ' || u.last_name AS counterpart_name,
               u.role AS counterpart_role
        FROM   messages m
        JOIN   users u ON m.receiver_id = u.user_id
        WHERE  m.sender_id = ?1
        ORDER  BY m.created_at DESC, m.message_id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

pub async fn mark_read(executor: impl SqliteExecutor<'_>, message_id: i64) -> Result<()> {
    sqlx::query("UPDATE messages SET is_read = 1 WHERE message_id = ?1")
        .bind(message_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete_message(executor: impl SqliteExecutor<'_>, message_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM messages WHERE message_id = ?1")
        .bind(message_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn count_unread(executor: impl SqliteExecutor<'_>, user_id: i64) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND is_read = 0")
            .bind(user_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}
