//! Confirmation writes and reads.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use crate::errors::Result;
use crate::models::{Confirmation, ConfirmationDetails};

/// Insert a confirmation. A second insert for the same sponsorship fails with a
/// unique-key violation.
pub async fn insert_confirmation(
    executor: impl SqliteExecutor<'_>,
    sponsorship_id: i64,
    confirmed_by: i64,
    proof_image: Option<&str>,
    notes: Option<&str>,
) -> std::result::Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO confirmations
            (sponsorship_id, confirmed_by, proof_image, notes, confirmation_date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(sponsorship_id)
    .bind(confirmed_by)
    .bind(proof_image)
    .bind(notes)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_for_sponsorship(
    executor: impl SqliteExecutor<'_>,
    sponsorship_id: i64,
) -> Result<Option<Confirmation>> {
    let row = sqlx::query_as::<_, Confirmation>(
        r#"
        SELECT confirmation_id, sponsorship_id, confirmed_by, proof_image, notes,
               confirmation_date
        FROM   confirmations
        WHERE  sponsorship_id = ?1
        "#,
    )
    .bind(sponsorship_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

pub async fn find_details_for_sponsorship(
    executor: impl SqliteExecutor<'_>,
    sponsorship_id: i64,
) -> Result<Option<ConfirmationDetails>> {
    let row = sqlx::query_as::<_, ConfirmationDetails>(
        r#"
        SELECT c.confirmation_id, c.sponsorship_id, c.confirmed_by, c.proof_image,
               c.notes, c.confirmation_date,
               u.first_name || ' ' || u.last_name AS confirmer_name
        FROM   confirmations c
        JOIN   users u ON c.confirmed_by = u.user_id
        WHERE  c.sponsorship_id = ?1
        "#,
    )
    .bind(sponsorship_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// Number of confirmations recorded inside the optional window.
pub async fn count_in_window(
    executor: impl SqliteExecutor<'_>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM   confirmations
        WHERE  (?1 IS NULL OR confirmation_date >= ?1)
          AND  (?2 IS NULL OR confirmation_date <= ?2)
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(executor)
    .await?;
    Ok(count)
}
