//! Report ledger plus the aggregate queries the reports are built from.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteExecutor;

use crate::errors::Result;
use crate::models::{Report, ReportRecord, ReportType, Role, SponsorshipStatus};

const RECORD_SELECT: &str = r#"
    SELECT r.report_id, r.title, r.description, r.generated_by, r.report_type, r.created_at,
           u.first_name || ' ' || u.last_name AS generator_name
    FROM   reports r
    JOIN   users u ON r.generated_by = u.user_id
"#;

// ─────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────

pub async fn insert_report(
    executor: impl SqliteExecutor<'_>,
    title: &str,
    description: &str,
    generated_by: i64,
    report_type: ReportType,
) -> Result<Report> {
    let row = sqlx::query_as::<_, Report>(
        r#"
        INSERT INTO reports (title, description, generated_by, report_type, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING report_id, title, description, generated_by, report_type, created_at
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(generated_by)
    .bind(report_type)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;
    Ok(row)
}

/// All reports, or only those generated by `generated_by`, newest first.
pub async fn list_reports(
    executor: impl SqliteExecutor<'_>,
    generated_by: Option<i64>,
) -> Result<Vec<ReportRecord>> {
    let sql = format!(
        "{RECORD_SELECT} WHERE (?1 IS NULL OR r.generated_by = ?1) \
         ORDER BY r.created_at DESC, r.report_id DESC"
    );
    let rows = sqlx::query_as::<_, ReportRecord>(&sql)
        .bind(generated_by)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

pub async fn find_report(
    executor: impl SqliteExecutor<'_>,
    report_id: i64,
) -> Result<Option<ReportRecord>> {
    let sql = format!("{RECORD_SELECT} WHERE r.report_id = ?1");
    let row = sqlx::query_as::<_, ReportRecord>(&sql)
        .bind(report_id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn delete_report(executor: impl SqliteExecutor<'_>, report_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM reports WHERE report_id = ?1")
        .bind(report_id)
        .execute(executor)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Aggregates
// ─────────────────────────────────────────────────────────

/// One sponsorship reduced to the fields the financial report groups on.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AmountRow {
    pub amount: String,
    pub currency: String,
    pub status: SponsorshipStatus,
    pub start_date: NaiveDate,
}

/// Amount rows whose start date falls in `year` (and `month`, when given).
pub async fn amounts_for_period(
    executor: impl SqliteExecutor<'_>,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<Vec<AmountRow>> {
    let rows = sqlx::query_as::<_, AmountRow>(
        r#"
        SELECT amount, currency, status, start_date
        FROM   sponsorships
        WHERE  (?1 IS NULL OR CAST(strftime('%Y', start_date) AS INTEGER) = ?1)
          AND  (?2 IS NULL OR CAST(strftime('%m', start_date) AS INTEGER) = ?2)
        "#,
    )
    .bind(year)
    .bind(month)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Users registered inside the window, counted per role.
pub async fn users_by_role(
    executor: impl SqliteExecutor<'_>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<(Role, i64)>> {
    let rows = sqlx::query_as::<_, (Role, i64)>(
        r#"
        SELECT role, COUNT(*)
        FROM   users
        WHERE  (?1 IS NULL OR created_at >= ?1)
          AND  (?2 IS NULL OR created_at <= ?2)
        GROUP  BY role
        ORDER  BY role
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Sponsorships created inside the window, counted per status.
pub async fn sponsorships_by_status(
    executor: impl SqliteExecutor<'_>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<(SponsorshipStatus, i64)>> {
    let rows = sqlx::query_as::<_, (SponsorshipStatus, i64)>(
        r#"
        SELECT status, COUNT(*)
        FROM   sponsorships
        WHERE  (?1 IS NULL OR created_at >= ?1)
          AND  (?2 IS NULL OR created_at <= ?2)
        GROUP  BY status
        ORDER  BY status
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}
