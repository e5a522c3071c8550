//! Sponsorship writes and the enriched read queries.

use chrono::{NaiveDate, Utc};
use sqlx::SqliteExecutor;

use crate::errors::Result;
use crate::models::{
    Frequency, Sponsorship, SponsorshipDetails, SponsorshipStatus, SponsorshipSummary,
};

/// Validated terms of a sponsorship about to be persisted.
#[derive(Debug, Clone)]
pub struct SponsorshipTerms<'a> {
    pub sponsor_id: i64,
    pub receiver_id: i64,
    pub amount: &'a str,
    pub currency: &'a str,
    pub purpose: Option<&'a str>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub frequency: Frequency,
}

const SPONSORSHIP_COLUMNS: &str = "s.sponsorship_id, s.sponsor_id, s.receiver_id, s.amount, \
     s.currency, s.purpose, s.start_date, s.end_date, s.frequency, s.status, s.created_at";

// ─────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────

/// Insert a new sponsorship in the `pending` state and return its id.
pub async fn insert_sponsorship(
    executor: impl SqliteExecutor<'_>,
    terms: &SponsorshipTerms<'_>,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO sponsorships
            (sponsor_id, receiver_id, amount, currency, purpose, start_date,
             end_date, frequency, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(terms.sponsor_id)
    .bind(terms.receiver_id)
    .bind(terms.amount)
    .bind(terms.currency)
    .bind(terms.purpose)
    .bind(terms.start_date)
    .bind(terms.end_date)
    .bind(terms.frequency)
    .bind(SponsorshipStatus::Pending)
    .bind(Utc::now())
    .execute(executor)
    .await?
    .last_insert_rowid();
    Ok(id)
}

/// Unconditionally overwrite the status. Returns the number of rows touched.
pub async fn set_status(
    executor: impl SqliteExecutor<'_>,
    sponsorship_id: i64,
    status: SponsorshipStatus,
) -> Result<u64> {
    let rows = sqlx::query("UPDATE sponsorships SET status = ?1 WHERE sponsorship_id = ?2")
        .bind(status)
        .bind(sponsorship_id)
        .execute(executor)
        .await?
        .rows_affected();
    Ok(rows)
}

/// Compare-and-set: only writes when the stored status still equals `expected`.
pub async fn swap_status(
    executor: impl SqliteExecutor<'_>,
    sponsorship_id: i64,
    expected: SponsorshipStatus,
    status: SponsorshipStatus,
) -> Result<bool> {
    let rows = sqlx::query(
        "UPDATE sponsorships SET status = ?1 WHERE sponsorship_id = ?2 AND status = ?3",
    )
    .bind(status)
    .bind(sponsorship_id)
    .bind(expected)
    .execute(executor)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

pub async fn find_sponsorship(
    executor: impl SqliteExecutor<'_>,
    sponsorship_id: i64,
) -> Result<Option<Sponsorship>> {
    let sql = format!("SELECT {SPONSORSHIP_COLUMNS} FROM sponsorships s WHERE s.sponsorship_id = ?1");
    let row = sqlx::query_as::<_, Sponsorship>(&sql)
        .bind(sponsorship_id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Sponsorships funded by `sponsor_id`, newest first, named after the receiver.
pub async fn list_for_sponsor(
    executor: impl SqliteExecutor<'_>,
    sponsor_id: i64,
) -> Result<Vec<SponsorshipSummary>> {
    let sql = format!(
        r#"
        SELECT {SPONSORSHIP_COLUMNS},
               u.first_name || ' ' || u.last_name AS counterpart_name,
               c.confirmation_id, c.confirmation_date, c.proof_image
        FROM   sponsorships s
        JOIN   users u ON s.receiver_id = u.user_id
        LEFT   JOIN confirmations c ON s.sponsorship_id = c.sponsorship_id
        WHERE  s.sponsor_id = ?1
        ORDER  BY s.created_at DESC, s.sponsorship_id DESC
        "#
    );
    let rows = sqlx::query_as::<_, SponsorshipSummary>(&sql)
        .bind(sponsor_id)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

/// Sponsorships received by `receiver_id`, newest first, named after the sponsor.
pub async fn list_for_receiver(
    executor: impl SqliteExecutor<'_>,
    receiver_id: i64,
) -> Result<Vec<SponsorshipSummary>> {
    let sql = format!(
        r#"
        SELECT {SPONSORSHIP_COLUMNS},
               u.first_name || ' ' || u.last_name AS counterpart_name,
               c.confirmation_id, c.confirmation_date, c.proof_image
        FROM   sponsorships s
        JOIN   users u ON s.sponsor_id = u.user_id
        LEFT   JOIN confirmations c ON s.sponsorship_id = c.sponsorship_id
        WHERE  s.receiver_id = ?1
        ORDER  BY s.created_at DESC, s.sponsorship_id DESC
        "#
    );
    let rows = sqlx::query_as::<_, SponsorshipSummary>(&sql)
        .bind(receiver_id)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

pub async fn find_details(
    executor: impl SqliteExecutor<'_>,
    sponsorship_id: i64,
) -> Result<Option<SponsorshipDetails>> {
    let sql = format!(
        r#"
        SELECT {SPONSORSHIP_COLUMNS},
               sp.first_name || ' ' || sp.last_name AS sponsor_name,
               rc.first_name || ' ' || rc.last_name AS receiver_name,
               c.confirmation_id, c.confirmation_date, c.proof_image, c.notes
        FROM   sponsorships s
        JOIN   users sp ON s.sponsor_id = sp.user_id
        JOIN   users rc ON s.receiver_id = rc.user_id
        LEFT   JOIN confirmations c ON s.sponsorship_id = c.sponsorship_id
        WHERE  s.sponsorship_id = ?1
        "#
    );
    let row = sqlx::query_as::<_, SponsorshipDetails>(&sql)
        .bind(sponsorship_id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Every sponsorship whose start date falls in the inclusive window, newest first.
/// `sponsor_id` narrows the result to one sponsor.
pub async fn list_in_window(
    executor: impl SqliteExecutor<'_>,
    sponsor_id: Option<i64>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    status: Option<SponsorshipStatus>,
) -> Result<Vec<SponsorshipDetails>> {
    let sql = format!(
        r#"
        SELECT {SPONSORSHIP_COLUMNS},
               sp.first_name || ' ' || sp.last_name AS sponsor_name,
               rc.first_name || ' ' || rc.last_name AS receiver_name,
               c.confirmation_id, c.confirmation_date, c.proof_image, c.notes
        FROM   sponsorships s
        JOIN   users sp ON s.sponsor_id = sp.user_id
        JOIN   users rc ON s.receiver_id = rc.user_id
        LEFT   JOIN confirmations c ON s.sponsorship_id = c.sponsorship_id
        WHERE  (?1 IS NULL OR s.sponsor_id = ?1)
          AND  (?2 IS NULL OR s.start_date >= ?2)
          AND  (?3 IS NULL OR s.start_date <= ?3)
          AND  (?4 IS NULL OR s.status = ?4)
        ORDER  BY s.created_at DESC, s.sponsorship_id DESC
        "#
    );
    let rows = sqlx::query_as::<_, SponsorshipDetails>(&sql)
        .bind(sponsor_id)
        .bind(start)
        .bind(end)
        .bind(status)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}
