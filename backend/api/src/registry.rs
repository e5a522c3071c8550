//! Sponsorship registry: creation, listing, lookup and status changes.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::{can_access, Principal};
use crate::db;
use crate::db::sponsorships::SponsorshipTerms;
use crate::errors::{AppError, FieldError, Result};
use crate::models::{Frequency, Role, SponsorshipDetails, SponsorshipStatus, SponsorshipSummary};
use crate::push::PushChannel;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Body of `POST /api/sponsorships`, before validation.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSponsorshipRequest {
    pub receiver_id: Option<i64>,
    /// A JSON number or a numeric string.
    pub amount: Option<Value>,
    pub currency: Option<String>,
    pub purpose: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub frequency: Option<String>,
}

/// Sponsorship terms that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSponsorship {
    pub receiver_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub purpose: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub frequency: Frequency,
}

impl CreateSponsorshipRequest {
    /// Check every field, reporting all problems at once.
    pub fn validate(self) -> Result<NewSponsorship> {
        let mut errors = Vec::new();

        if self.receiver_id.is_none() {
            errors.push(FieldError::new("receiverId", "Receiver ID is required"));
        }

        let amount = match self.amount.as_ref().map(parse_amount) {
            Some(Ok(amount)) if amount > Decimal::ZERO => Some(amount),
            Some(Ok(_)) => {
                errors.push(FieldError::new("amount", "Amount must be greater than zero"));
                None
            }
            Some(Err(())) | None => {
                errors.push(FieldError::new(
                    "amount",
                    "Amount is required and must be a number",
                ));
                None
            }
        };

        let currency = match self.currency.as_deref().map(str::trim) {
            None | Some("") => Some(DEFAULT_CURRENCY.to_string()),
            Some(code) if code.len() <= 10 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(code.to_ascii_uppercase())
            }
            Some(_) => {
                errors.push(FieldError::new("currency", "Currency must be a currency code"));
                None
            }
        };

        let start_date = match self.start_date.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("startDate", "Start date is required"));
                None
            }
            Some(raw) => parse_date(raw).or_else(|| {
                errors.push(FieldError::new("startDate", "Start date is not a valid date"));
                None
            }),
        };

        let end_date = match self.end_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_date(raw) {
                Some(end) if start_date.map_or(true, |start| end >= start) => Some(end),
                Some(_) => {
                    errors.push(FieldError::new(
                        "endDate",
                        "End date cannot be before the start date",
                    ));
                    None
                }
                None => {
                    errors.push(FieldError::new("endDate", "End date is not a valid date"));
                    None
                }
            },
        };

        let frequency = match self.frequency.as_deref().and_then(Frequency::parse) {
            Some(frequency) => Some(frequency),
            None => {
                errors.push(FieldError::new("frequency", "Frequency must be valid"));
                None
            }
        };

        match (self.receiver_id, amount, currency, start_date, frequency) {
            (Some(receiver_id), Some(amount), Some(currency), Some(start_date), Some(frequency))
                if errors.is_empty() =>
            {
                Ok(NewSponsorship {
                    receiver_id,
                    amount: amount.normalize(),
                    currency,
                    purpose: self
                        .purpose
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty()),
                    start_date,
                    end_date,
                    frequency,
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }
}

fn parse_amount(value: &Value) -> std::result::Result<Decimal, ()> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(()),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ())
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its date part is kept).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

// ─────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────

/// Create a `pending` sponsorship funded by `principal` and notify the receiver.
pub async fn create_sponsorship(
    pool: &SqlitePool,
    push: &dyn PushChannel,
    principal: &Principal,
    request: CreateSponsorshipRequest,
) -> Result<i64> {
    let new = request.validate()?;

    if principal.role != Role::Sponsor {
        return Err(AppError::Forbidden(
            "Only sponsors can create sponsorships".to_string(),
        ));
    }

    let receiver = db::users::find_user(pool, new.receiver_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Receiver not found".to_string()))?;
    if receiver.role != Role::Receiver {
        return Err(AppError::invalid(
            "receiverId",
            "The selected user is not a receiver",
        ));
    }

    let amount = new.amount.to_string();
    let terms = SponsorshipTerms {
        sponsor_id: principal.id,
        receiver_id: receiver.user_id,
        amount: &amount,
        currency: &new.currency,
        purpose: new.purpose.as_deref(),
        start_date: new.start_date,
        end_date: new.end_date,
        frequency: new.frequency,
    };

    let mut tx = pool.begin().await?;
    let sponsorship_id = db::sponsorships::insert_sponsorship(&mut *tx, &terms).await?;
    let notification = db::notifications::insert_notification(
        &mut *tx,
        receiver.user_id,
        "New Sponsorship Received",
        &format!(
            "You have received a new sponsorship of {amount} {}. Please confirm receipt.",
            new.currency
        ),
    )
    .await?;
    tx.commit().await?;

    push.deliver(receiver.user_id, &notification);
    info!(
        "Sponsorship {sponsorship_id} created: {amount} {} from user {} to user {}",
        new.currency, principal.id, receiver.user_id
    );
    Ok(sponsorship_id)
}

/// Sponsorships in which `principal` takes part as `as_role`, newest first.
/// `as_role` defaults to the principal's own role.
pub async fn sponsorships_for(
    pool: &SqlitePool,
    principal: &Principal,
    as_role: Option<Role>,
) -> Result<Vec<SponsorshipSummary>> {
    let role = as_role.unwrap_or(principal.role);
    if !principal.is_admin() && role != principal.role {
        return Err(AppError::Forbidden(format!(
            "Not authorized to list sponsorships as {}",
            role.as_str()
        )));
    }
    match role {
        Role::Sponsor => db::sponsorships::list_for_sponsor(pool, principal.id).await,
        Role::Receiver => db::sponsorships::list_for_receiver(pool, principal.id).await,
        Role::Admin => Err(AppError::invalid(
            "role",
            "Role must be either sponsor or receiver",
        )),
    }
}

pub async fn sponsorship_by_id(
    pool: &SqlitePool,
    sponsorship_id: i64,
    principal: &Principal,
) -> Result<SponsorshipDetails> {
    let details = db::sponsorships::find_details(pool, sponsorship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sponsorship not found".to_string()))?;
    if !can_access(&details.sponsorship, principal) {
        return Err(AppError::Forbidden(
            "Not authorized to view this sponsorship".to_string(),
        ));
    }
    Ok(details)
}

/// Move a sponsorship to `status`.
///
/// With `strict` set the lifecycle table applies and the write is a
/// compare-and-set against the status that was read; otherwise any
/// authorized party may set any status.
pub async fn update_status(
    pool: &SqlitePool,
    sponsorship_id: i64,
    status: Option<&str>,
    principal: &Principal,
    strict: bool,
) -> Result<SponsorshipStatus> {
    let next = status.and_then(SponsorshipStatus::parse).ok_or_else(|| {
        AppError::invalid(
            "status",
            "Status must be one of pending, active, confirmed, completed, cancelled",
        )
    })?;

    let sponsorship = db::sponsorships::find_sponsorship(pool, sponsorship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sponsorship not found".to_string()))?;
    if !can_access(&sponsorship, principal) {
        return Err(AppError::Forbidden(
            "Not authorized to update this sponsorship".to_string(),
        ));
    }

    let current = sponsorship.status;
    if strict {
        if !current.can_transition_to(next) {
            return Err(AppError::invalid(
                "status",
                format!(
                    "Cannot change status from {} to {}",
                    current.as_str(),
                    next.as_str()
                ),
            ));
        }
        if current != next
            && !db::sponsorships::swap_status(pool, sponsorship_id, current, next).await?
        {
            return Err(AppError::Conflict(
                "Sponsorship status was changed by another request".to_string(),
            ));
        }
    } else {
        db::sponsorships::set_status(pool, sponsorship_id, next).await?;
    }

    info!(
        "Sponsorship {sponsorship_id} status {} -> {} by user {}",
        current.as_str(),
        next.as_str(),
        principal.id
    );
    Ok(next)
}
