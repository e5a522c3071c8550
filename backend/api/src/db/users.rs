//! Read access to the identity service's `users` table.

use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::errors::Result;
use crate::models::{Role, User};

pub async fn find_user(executor: impl SqliteExecutor<'_>, user_id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT user_id, first_name, last_name, email, role, created_at
        FROM   users
        WHERE  user_id = ?1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(user)
}

/// Register a user row. Accounts are normally provisioned by the identity
/// service; this is used for seeding and by the test suites.
pub async fn insert_user(
    executor: impl SqliteExecutor<'_>,
    first_name: &str,
    last_name: &str,
    email: &str,
    role: Role,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, email, role, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(role)
    .bind(Utc::now())
    .execute(executor)
    .await?
    .last_insert_rowid();
    Ok(id)
}

/// Deactivated users stay readable but drop out of the receiver directory.
pub async fn set_active(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
    active: bool,
) -> Result<u64> {
    let rows = sqlx::query("UPDATE users SET is_active = ?1 WHERE user_id = ?2")
        .bind(active)
        .bind(user_id)
        .execute(executor)
        .await?
        .rows_affected();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn insert_then_find() {
        let pool = test_pool().await;
        let id = insert_user(&pool, "Ada", "Obi", "ada@example.org", Role::Receiver)
            .await
            .unwrap();

        let user = find_user(&pool, id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Receiver);
        assert_eq!(user.display_name(), "Ada Obi");
        assert!(find_user(&pool, id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let pool = test_pool().await;
        insert_user(&pool, "A", "B", "same@example.org", Role::Sponsor)
            .await
            .unwrap();
        let err = insert_user(&pool, "C", "D", "same@example.org", Role::Sponsor)
            .await
            .unwrap_err();
        match err {
            crate::errors::AppError::Database(e) => {
                assert!(crate::errors::is_unique_violation(&e))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
