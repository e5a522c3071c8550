//! Sponsorship, financial and activity reports.
//!
//! Every generated report is also recorded in the `reports` ledger so it can
//! be listed, fetched and deleted later; the ledger keeps only the title and
//! a one-line description, not the data.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::Principal;
use crate::db;
use crate::errors::{AppError, Result};
use crate::models::{ReportRecord, ReportType, Role, SponsorshipDetails, SponsorshipStatus};
use crate::registry::parse_date;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FinancialReportQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A freshly generated report and its ledger id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport<T> {
    pub report_id: i64,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub data: T,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipTotals {
    pub total_count: usize,
    pub total_amount: Decimal,
    pub confirmed_count: usize,
    pub pending_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SponsorshipReport {
    pub sponsorships: Vec<SponsorshipDetails>,
    pub summary: SponsorshipTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRow {
    pub year: i32,
    pub month: u32,
    pub currency: String,
    pub status: SponsorshipStatus,
    pub count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: SponsorshipStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub users: Vec<RoleCount>,
    pub sponsorships: Vec<StatusCount>,
    pub confirmations: i64,
}

fn optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| AppError::invalid(field, "Not a valid date")),
    }
}

fn require_admin(principal: &Principal, what: &str) -> Result<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Not authorized to generate {what}")))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ─────────────────────────────────────────────────────────
// Generators
// ─────────────────────────────────────────────────────────

/// Admins report on every sponsorship; sponsors only on their own.
pub async fn sponsorship_report(
    pool: &SqlitePool,
    principal: &Principal,
    query: SponsorshipReportQuery,
) -> Result<GeneratedReport<SponsorshipReport>> {
    let start = optional_date("startDate", query.start_date.as_deref())?;
    let end = optional_date("endDate", query.end_date.as_deref())?;
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            SponsorshipStatus::parse(raw)
                .ok_or_else(|| AppError::invalid("status", "Unknown sponsorship status"))?,
        ),
    };

    let scope = match principal.role {
        Role::Admin => None,
        Role::Sponsor => Some(principal.id),
        Role::Receiver => {
            return Err(AppError::Forbidden(
                "Not authorized to generate reports".to_string(),
            ))
        }
    };

    let sponsorships =
        db::sponsorships::list_in_window(pool, scope, start, end, status).await?;
    let summary = summarize(&sponsorships);

    let title = format!("Sponsorship Report {}", today());
    let description = format!(
        "Report generated with {} sponsorships. Total amount: {}",
        summary.total_count, summary.total_amount
    );
    let report = db::reports::insert_report(
        pool,
        &title,
        &description,
        principal.id,
        ReportType::Sponsorship,
    )
    .await?;
    info!("Report {} generated by user {}", report.report_id, principal.id);

    Ok(GeneratedReport {
        report_id: report.report_id,
        title,
        generated_at: report.created_at,
        data: SponsorshipReport {
            sponsorships,
            summary,
        },
    })
}

fn parse_stored_amount(id: i64, amount: &str) -> Decimal {
    Decimal::from_str(amount).unwrap_or_else(|_| {
        warn!("Sponsorship {id} has a malformed amount {amount:?}; counted as zero");
        Decimal::ZERO
    })
}

fn summarize(sponsorships: &[SponsorshipDetails]) -> SponsorshipTotals {
    let total_amount = sponsorships
        .iter()
        .map(|s| parse_stored_amount(s.sponsorship.sponsorship_id, &s.sponsorship.amount))
        .sum::<Decimal>()
        .normalize();
    let count_of = |status: SponsorshipStatus| {
        sponsorships
            .iter()
            .filter(|s| s.sponsorship.status == status)
            .count()
    };
    SponsorshipTotals {
        total_count: sponsorships.len(),
        total_amount,
        confirmed_count: count_of(SponsorshipStatus::Confirmed),
        pending_count: count_of(SponsorshipStatus::Pending),
    }
}

/// Totals per currency and status for each start month, newest period first.
pub async fn financial_report(
    pool: &SqlitePool,
    principal: &Principal,
    query: FinancialReportQuery,
) -> Result<GeneratedReport<Vec<FinancialRow>>> {
    if let Some(month) = query.month {
        if !(1..=12).contains(&month) {
            return Err(AppError::invalid("month", "Month must be between 1 and 12"));
        }
    }
    require_admin(principal, "financial reports")?;

    let rows = db::reports::amounts_for_period(pool, query.year, query.month).await?;

    let mut groups: BTreeMap<(Reverse<i32>, Reverse<u32>, String, &'static str), FinancialRow> =
        BTreeMap::new();
    for row in rows {
        let year = row.start_date.year();
        let month = row.start_date.month();
        let amount = Decimal::from_str(&row.amount).unwrap_or_else(|_| {
            warn!("Malformed amount {:?} skipped in financial report", row.amount);
            Decimal::ZERO
        });
        let entry = groups
            .entry((
                Reverse(year),
                Reverse(month),
                row.currency.clone(),
                row.status.as_str(),
            ))
            .or_insert_with(|| FinancialRow {
                year,
                month,
                currency: row.currency.clone(),
                status: row.status,
                count: 0,
                total_amount: Decimal::ZERO,
            });
        entry.count += 1;
        entry.total_amount += amount;
    }
    let data: Vec<FinancialRow> = groups
        .into_values()
        .map(|mut row| {
            row.total_amount = row.total_amount.normalize();
            row
        })
        .collect();

    let period = match (query.year, query.month) {
        (Some(year), Some(month)) => format!("{year}-{month}"),
        (Some(year), None) => year.to_string(),
        (None, Some(month)) => format!("All Years-{month}"),
        (None, None) => "All Years".to_string(),
    };
    let title = format!("Financial Report {period}");
    let description = format!("Financial report generated for {}", period.to_lowercase());
    let report = db::reports::insert_report(
        pool,
        &title,
        &description,
        principal.id,
        ReportType::Financial,
    )
    .await?;

    Ok(GeneratedReport {
        report_id: report.report_id,
        title,
        generated_at: report.created_at,
        data,
    })
}

/// Registrations, sponsorships and confirmations inside an optional window.
/// The end date is inclusive of its whole day.
pub async fn activity_report(
    pool: &SqlitePool,
    principal: &Principal,
    query: ActivityReportQuery,
) -> Result<GeneratedReport<ActivityReport>> {
    let start = optional_date("startDate", query.start_date.as_deref())?;
    let end = optional_date("endDate", query.end_date.as_deref())?;
    require_admin(principal, "activity reports")?;

    let from = start.map(|d| d.and_time(NaiveTime::MIN).and_utc());
    let to = end
        .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
        .map(|dt| dt.and_utc());

    let users = db::reports::users_by_role(pool, from, to)
        .await?
        .into_iter()
        .map(|(role, count)| RoleCount { role, count })
        .collect();
    let sponsorships = db::reports::sponsorships_by_status(pool, from, to)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    let confirmations = db::confirmations::count_in_window(pool, from, to).await?;

    let title = format!("Activity Report {}", today());
    let description = format!(
        "Activity report generated for period {} to {}",
        start.map_or_else(|| "beginning".to_string(), |d| d.to_string()),
        end.map_or_else(|| "now".to_string(), |d| d.to_string()),
    );
    let report =
        db::reports::insert_report(pool, &title, &description, principal.id, ReportType::Activity)
            .await?;

    Ok(GeneratedReport {
        report_id: report.report_id,
        title,
        generated_at: report.created_at,
        data: ActivityReport {
            users,
            sponsorships,
            confirmations,
        },
    })
}

// ─────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────

pub async fn list_reports(pool: &SqlitePool, principal: &Principal) -> Result<Vec<ReportRecord>> {
    let scope = (!principal.is_admin()).then_some(principal.id);
    db::reports::list_reports(pool, scope).await
}

async fn owned_report(
    pool: &SqlitePool,
    report_id: i64,
    principal: &Principal,
    action: &str,
) -> Result<ReportRecord> {
    let record = db::reports::find_report(pool, report_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;
    if !principal.is_admin() && record.report.generated_by != principal.id {
        return Err(AppError::Forbidden(format!(
            "Not authorized to {action} this report"
        )));
    }
    Ok(record)
}

pub async fn get_report(
    pool: &SqlitePool,
    report_id: i64,
    principal: &Principal,
) -> Result<ReportRecord> {
    owned_report(pool, report_id, principal, "view").await
}

pub async fn delete_report(pool: &SqlitePool, report_id: i64, principal: &Principal) -> Result<()> {
    owned_report(pool, report_id, principal, "delete").await?;
    db::reports::delete_report(pool, report_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{self, CreateConfirmationRequest};
    use crate::db::test_pool;
    use crate::push::PushHub;
    use crate::registry::{self, CreateSponsorshipRequest};
    use crate::testing::{cast, principal, Cast};

    async fn fund(
        pool: &SqlitePool,
        cast: &Cast,
        amount: &str,
        currency: &str,
        start: &str,
    ) -> i64 {
        registry::create_sponsorship(
            pool,
            &PushHub::new(1),
            &cast.sponsor,
            CreateSponsorshipRequest {
                receiver_id: Some(cast.receiver.id),
                amount: Some(serde_json::json!(amount)),
                currency: Some(currency.into()),
                purpose: None,
                start_date: Some(start.into()),
                end_date: None,
                frequency: Some("one-time".into()),
            },
        )
        .await
        .unwrap()
    }

    async fn confirm(pool: &SqlitePool, cast: &Cast, id: i64) {
        coordinator::create_confirmation(
            pool,
            &PushHub::new(1),
            &cast.receiver,
            CreateConfirmationRequest {
                sponsorship_id: Some(id),
                ..Default::default()
            },
            false,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn sponsorship_report_totals_and_scope() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let a = fund(&pool, &cast, "50", "USD", "2024-01-01").await;
        fund(&pool, &cast, "25.25", "USD", "2024-02-01").await;
        confirm(&pool, &cast, a).await;

        let report = sponsorship_report(&pool, &cast.sponsor, Default::default())
            .await
            .unwrap();
        assert_eq!(report.data.summary.total_count, 2);
        assert_eq!(report.data.summary.total_amount.to_string(), "75.25");
        assert_eq!(report.data.summary.confirmed_count, 1);
        assert_eq!(report.data.summary.pending_count, 1);

        let outsider = sponsorship_report(&pool, &cast.outsider, Default::default())
            .await
            .unwrap();
        assert_eq!(outsider.data.summary.total_count, 0);

        let filtered = sponsorship_report(
            &pool,
            &cast.admin,
            SponsorshipReportQuery {
                start_date: Some("2024-01-15".into()),
                status: Some("pending".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.data.sponsorships.len(), 1);
        assert_eq!(filtered.data.sponsorships[0].sponsorship.amount, "25.25");

        assert!(matches!(
            sponsorship_report(&pool, &cast.receiver, Default::default()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn financial_report_groups_by_period() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        fund(&pool, &cast, "10", "USD", "2024-01-05").await;
        fund(&pool, &cast, "15", "USD", "2024-01-20").await;
        fund(&pool, &cast, "7", "EUR", "2024-01-09").await;
        fund(&pool, &cast, "30", "USD", "2024-03-01").await;
        fund(&pool, &cast, "99", "USD", "2023-12-31").await;

        let report = financial_report(
            &pool,
            &cast.admin,
            FinancialReportQuery {
                year: Some(2024),
                month: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(report.title, "Financial Report 2024");

        let rows: Vec<(u32, &str, i64, String)> = report
            .data
            .iter()
            .map(|r| (r.month, r.currency.as_str(), r.count, r.total_amount.to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (3, "USD", 1, "30".to_string()),
                (1, "EUR", 1, "7".to_string()),
                (1, "USD", 2, "25".to_string()),
            ]
        );

        assert!(matches!(
            financial_report(&pool, &cast.sponsor, Default::default()).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            financial_report(
                &pool,
                &cast.admin,
                FinancialReportQuery {
                    year: None,
                    month: Some(13)
                }
            )
            .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn activity_report_counts() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        principal(&pool, "Rhea", "Second", Role::Receiver).await;
        let id = fund(&pool, &cast, "10", "USD", "2024-01-05").await;
        fund(&pool, &cast, "10", "USD", "2024-01-05").await;
        confirm(&pool, &cast, id).await;

        let report = activity_report(&pool, &cast.admin, Default::default())
            .await
            .unwrap();
        let receivers = report
            .data
            .users
            .iter()
            .find(|c| c.role == Role::Receiver)
            .unwrap();
        assert_eq!(receivers.count, 2);
        let pending = report
            .data
            .sponsorships
            .iter()
            .find(|c| c.status == SponsorshipStatus::Pending)
            .unwrap();
        assert_eq!(pending.count, 1);
        assert_eq!(report.data.confirmations, 1);

        let past = activity_report(
            &pool,
            &cast.admin,
            ActivityReportQuery {
                start_date: None,
                end_date: Some("2000-01-01".into()),
            },
        )
        .await
        .unwrap();
        assert!(past.data.users.is_empty());
        assert_eq!(past.data.confirmations, 0);
    }

    #[tokio::test]
    async fn ledger_visibility() {
        let pool = test_pool().await;
        let cast = cast(&pool).await;
        let mine = sponsorship_report(&pool, &cast.sponsor, Default::default())
            .await
            .unwrap();
        let admins = activity_report(&pool, &cast.admin, Default::default())
            .await
            .unwrap();

        assert_eq!(list_reports(&pool, &cast.admin).await.unwrap().len(), 2);
        let own = list_reports(&pool, &cast.sponsor).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].generator_name, "Sam Sponsor");

        assert!(matches!(
            get_report(&pool, admins.report_id, &cast.sponsor).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            delete_report(&pool, mine.report_id, &cast.outsider).await,
            Err(AppError::Forbidden(_))
        ));
        delete_report(&pool, mine.report_id, &cast.sponsor)
            .await
            .unwrap();
        assert!(matches!(
            get_report(&pool, mine.report_id, &cast.admin).await,
            Err(AppError::NotFound(_))
        ));
    }
}
