//! Confirmation coordinator.
//!
//! A confirmation is the receiver's acknowledgment that a sponsorship was
//! delivered. Creating one is gated on, in order: the sponsorship existing,
//! the caller being its receiver (or an admin), and no earlier confirmation.
//! The confirmation row, the `confirmed` status and the sponsor's
//! notification are written in one transaction; the live push happens after
//! commit and cannot undo it. With strict transitions on, only a sponsorship
//! whose status may move to `confirmed` can be confirmed, and the status
//! write is a compare-and-set against the status that was read.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::{can_access, Principal};
use crate::db;
use crate::errors::{is_unique_violation, AppError, Result};
use crate::models::{ConfirmationDetails, SponsorshipStatus};
use crate::push::PushChannel;

/// Body of `POST /api/confirmations`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfirmationRequest {
    pub sponsorship_id: Option<i64>,
    pub notes: Option<String>,
    /// Reference returned by the proof upload endpoint.
    pub proof_image: Option<String>,
}

pub async fn create_confirmation(
    pool: &SqlitePool,
    push: &dyn PushChannel,
    principal: &Principal,
    request: CreateConfirmationRequest,
    strict: bool,
) -> Result<i64> {
    let sponsorship_id = request
        .sponsorship_id
        .ok_or_else(|| AppError::invalid("sponsorshipId", "Sponsorship ID is required"))?;
    let notes = request
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let proof_image = request
        .proof_image
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let sponsorship = db::sponsorships::find_sponsorship(pool, sponsorship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sponsorship not found".to_string()))?;

    if !principal.is_admin() && principal.id != sponsorship.receiver_id {
        return Err(AppError::Forbidden(
            "Only the receiver can confirm receipt".to_string(),
        ));
    }

    if db::confirmations::find_for_sponsorship(pool, sponsorship_id)
        .await?
        .is_some()
    {
        return Err(already_confirmed());
    }

    let current = sponsorship.status;
    if strict && !current.can_transition_to(SponsorshipStatus::Confirmed) {
        return Err(AppError::Conflict(format!(
            "A {} sponsorship cannot be confirmed",
            current.as_str()
        )));
    }

    let mut tx = pool.begin().await?;
    let confirmation_id = match db::confirmations::insert_confirmation(
        &mut *tx,
        sponsorship_id,
        principal.id,
        proof_image.as_deref(),
        notes.as_deref(),
    )
    .await
    {
        Ok(id) => id,
        // Lost the race against a concurrent confirmer.
        Err(e) if is_unique_violation(&e) => {
            warn!("Concurrent confirmation rejected for sponsorship {sponsorship_id}");
            return Err(already_confirmed());
        }
        Err(e) => return Err(e.into()),
    };
    if strict {
        let swapped = db::sponsorships::swap_status(
            &mut *tx,
            sponsorship_id,
            current,
            SponsorshipStatus::Confirmed,
        )
        .await?;
        if !swapped {
            // Dropping the transaction discards the confirmation row.
            return Err(AppError::Conflict(
                "Sponsorship status was changed by another request".to_string(),
            ));
        }
    } else {
        db::sponsorships::set_status(&mut *tx, sponsorship_id, SponsorshipStatus::Confirmed)
            .await?;
    }
    let notification = db::notifications::insert_notification(
        &mut *tx,
        sponsorship.sponsor_id,
        "Sponsorship Confirmed",
        &format!(
            "Your sponsorship has been confirmed by the receiver. Confirmation ID: {confirmation_id}"
        ),
    )
    .await?;
    tx.commit().await?;

    push.deliver(sponsorship.sponsor_id, &notification);
    info!(
        "Sponsorship {sponsorship_id} confirmed by user {} (confirmation {confirmation_id})",
        principal.id
    );
    Ok(confirmation_id)
}

fn already_confirmed() -> AppError {
    AppError::Conflict("This sponsorship has already been confirmed".to_string())
}

pub async fn confirmation_for(
    pool: &SqlitePool,
    sponsorship_id: i64,
    principal: &Principal,
) -> Result<ConfirmationDetails> {
    let sponsorship = db::sponsorships::find_sponsorship(pool, sponsorship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sponsorship not found".to_string()))?;
    if !can_access(&sponsorship, principal) {
        return Err(AppError::Forbidden(
            "Not authorized to view this confirmation".to_string(),
        ));
    }
    db::confirmations::find_details_for_sponsorship(pool, sponsorship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Confirmation not found".to_string()))
}
