//! Sponsor and receiver profiles, and the receiver directory sponsors browse
//! to find a `receiverId`.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::Principal;
use crate::db::{
    self,
    profiles::{ReceiverFields, SponsorFields},
};
use crate::errors::{AppError, FieldError, Result};
use crate::models::{ContactMethod, ReceiverListing, ReceiverProfile, Role, SponsorProfile};
use crate::registry::parse_date;

/// Body of `PUT /api/sponsors/profile`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorProfileUpdate {
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub preferred_contact_method: Option<String>,
}

/// Body of `PUT /api/receivers/profile`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverProfileUpdate {
    pub date_of_birth: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_contact: Option<String>,
    pub school_class: Option<String>,
    pub interests: Option<String>,
    pub needs: Option<String>,
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 7 to 15 digits, with an optional leading `+` and spaces, dashes or
/// parentheses as separators.
fn is_phone_number(raw: &str) -> bool {
    let body = raw.strip_prefix('+').unwrap_or(raw);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    body.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
        && (7..=15).contains(&digits)
}

fn require_role(principal: &Principal, role: Role) -> Result<()> {
    if principal.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only {}s can update this profile",
            role.as_str()
        )))
    }
}

fn check_viewer(principal: &Principal, owner: i64) -> Result<()> {
    if principal.is_admin() || principal.id == owner {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to view this profile".to_string(),
        ))
    }
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

pub async fn list_receivers(pool: &SqlitePool) -> Result<Vec<ReceiverListing>> {
    db::profiles::list_receivers(pool).await
}

/// `user_id` defaults to the caller.
pub async fn sponsor_profile(
    pool: &SqlitePool,
    user_id: Option<i64>,
    principal: &Principal,
) -> Result<SponsorProfile> {
    let profile = db::profiles::sponsor_profile(pool, user_id.unwrap_or(principal.id))
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    check_viewer(principal, profile.user.user_id)?;
    Ok(profile)
}

pub async fn receiver_profile(
    pool: &SqlitePool,
    user_id: Option<i64>,
    principal: &Principal,
) -> Result<ReceiverProfile> {
    let profile = db::profiles::receiver_profile(pool, user_id.unwrap_or(principal.id))
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    check_viewer(principal, profile.user.user_id)?;
    Ok(profile)
}

// ─────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────

pub async fn update_sponsor_profile(
    pool: &SqlitePool,
    principal: &Principal,
    update: SponsorProfileUpdate,
) -> Result<()> {
    require_role(principal, Role::Sponsor)?;

    let mut errors = Vec::new();
    let phone = text(&update.phone);
    if phone.is_some_and(|p| !is_phone_number(p)) {
        errors.push(FieldError::new("phone", "Phone number is invalid"));
    }
    let contact = match text(&update.preferred_contact_method) {
        None => None,
        Some(raw) => {
            let parsed = ContactMethod::parse(raw);
            if parsed.is_none() {
                errors.push(FieldError::new(
                    "preferredContactMethod",
                    "Invalid contact method",
                ));
            }
            parsed
        }
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let fields = SponsorFields {
        organization: text(&update.organization),
        phone,
        address: text(&update.address),
        city: text(&update.city),
        country: text(&update.country),
        preferred_contact_method: contact,
    };
    db::profiles::upsert_sponsor_profile(pool, principal.id, &fields).await?;
    info!("Sponsor {} updated their profile", principal.id);
    Ok(())
}

pub async fn update_receiver_profile(
    pool: &SqlitePool,
    principal: &Principal,
    update: ReceiverProfileUpdate,
) -> Result<()> {
    require_role(principal, Role::Receiver)?;

    let mut errors = Vec::new();
    let date_of_birth = match text(&update.date_of_birth) {
        None => None,
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.push(FieldError::new("dateOfBirth", "Date of birth is invalid"));
            }
            parsed
        }
    };
    let guardian_contact = text(&update.guardian_contact);
    if guardian_contact.is_some_and(|p| !is_phone_number(p)) {
        errors.push(FieldError::new(
            "guardianContact",
            "Guardian contact is invalid",
        ));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let fields = ReceiverFields {
        date_of_birth,
        guardian_name: text(&update.guardian_name),
        guardian_contact,
        school_class: text(&update.school_class),
        interests: text(&update.interests),
        needs: text(&update.needs),
    };
    db::profiles::upsert_receiver_profile(pool, principal.id, &fields).await?;
    info!("Receiver {} updated their profile", principal.id);
    Ok(())
}

/// Record an already-stored image as the profile picture of `principal`,
/// who must hold `role` (the role the upload route belongs to).
pub async fn set_profile_image(
    pool: &SqlitePool,
    principal: &Principal,
    role: Role,
    reference: &str,
) -> Result<()> {
    if role == Role::Admin || principal.role != role {
        return Err(AppError::Forbidden(format!(
            "Only {}s can upload this profile image",
            role.as_str()
        )));
    }
    db::profiles::set_profile_image(pool, role, principal.id, reference).await?;
    info!("User {} set profile image {reference}", principal.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::testing::cast;

    #[test]
    fn phone_numbers() {
        for ok in ["+44 20 7946 0958", "555-123-4567", "(030) 1234567", "0712345678"] {
            assert!(is_phone_number(ok), "{ok}");
        }
        for bad in ["12345", "call me", "+1 555 CALL NOW", "1234567890123456"] {
            assert!(!is_phone_number(bad), "{bad}");
        }
    }

    #[tokio::test]
    async fn profile_defaults_to_the_caller_and_is_private() {
        let pool = test_pool().await;
        let c = cast(&pool).await;

        let own = sponsor_profile(&pool, None, &c.sponsor).await.unwrap();
        assert_eq!(own.user.user_id, c.sponsor.id);

        assert!(matches!(
            sponsor_profile(&pool, Some(c.sponsor.id), &c.outsider).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(sponsor_profile(&pool, Some(c.sponsor.id), &c.admin)
            .await
            .is_ok());

        // A receiver has no sponsor profile and vice versa.
        assert!(matches!(
            sponsor_profile(&pool, Some(c.receiver.id), &c.admin).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            receiver_profile(&pool, None, &c.sponsor).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn sponsor_update_validates_and_saves() {
        let pool = test_pool().await;
        let c = cast(&pool).await;

        let err = update_sponsor_profile(
            &pool,
            &c.sponsor,
            SponsorProfileUpdate {
                phone: Some("not a phone".into()),
                preferred_contact_method: Some("pigeon".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        match err {
            AppError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["phone", "preferredContactMethod"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            update_sponsor_profile(&pool, &c.receiver, SponsorProfileUpdate::default()).await,
            Err(AppError::Forbidden(_))
        ));

        update_sponsor_profile(
            &pool,
            &c.sponsor,
            SponsorProfileUpdate {
                organization: Some("  Acme Trust ".into()),
                phone: Some("+254 712 345678".into()),
                preferred_contact_method: Some("system".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let saved = sponsor_profile(&pool, None, &c.sponsor).await.unwrap();
        assert_eq!(saved.organization.as_deref(), Some("Acme Trust"));
        assert_eq!(saved.preferred_contact_method, Some(ContactMethod::System));
    }

    #[tokio::test]
    async fn receiver_update_parses_birth_date() {
        let pool = test_pool().await;
        let c = cast(&pool).await;

        assert!(matches!(
            update_receiver_profile(
                &pool,
                &c.receiver,
                ReceiverProfileUpdate {
                    date_of_birth: Some("31/02/2012".into()),
                    ..Default::default()
                },
            )
            .await,
            Err(AppError::Validation(_))
        ));

        update_receiver_profile(
            &pool,
            &c.receiver,
            ReceiverProfileUpdate {
                date_of_birth: Some("2012-05-04".into()),
                school_class: Some("Grade 6".into()),
                guardian_contact: Some("0712 345 678".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let saved = receiver_profile(&pool, Some(c.receiver.id), &c.admin)
            .await
            .unwrap();
        assert_eq!(saved.date_of_birth.map(|d| d.to_string()).as_deref(), Some("2012-05-04"));

        let listing = list_receivers(&pool).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].school_class.as_deref(), Some("Grade 6"));
    }

    #[tokio::test]
    async fn profile_image_follows_the_route_role() {
        let pool = test_pool().await;
        let c = cast(&pool).await;

        assert!(matches!(
            set_profile_image(&pool, &c.sponsor, Role::Receiver, "profileImage-x.png").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            set_profile_image(&pool, &c.admin, Role::Admin, "profileImage-x.png").await,
            Err(AppError::Forbidden(_))
        ));

        set_profile_image(&pool, &c.receiver, Role::Receiver, "profileImage-x.png")
            .await
            .unwrap();
        let saved = receiver_profile(&pool, None, &c.receiver).await.unwrap();
        assert_eq!(saved.profile_image.as_deref(), Some("profileImage-x.png"));
    }
}
