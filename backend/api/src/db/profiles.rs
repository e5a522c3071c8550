//! Sponsor and receiver profiles, and the receiver directory.
//!
//! Profile rows are optional: reads LEFT JOIN them onto `users`, writes
//! upsert on `user_id`.

use chrono::NaiveDate;
use sqlx::SqliteExecutor;

use crate::errors::Result;
use crate::models::{ContactMethod, ReceiverListing, ReceiverProfile, Role, SponsorProfile};

/// Editable sponsor profile fields, already validated.
#[derive(Debug, Clone, Default)]
pub struct SponsorFields<'a> {
    pub organization: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    pub country: Option<&'a str>,
    pub preferred_contact_method: Option<ContactMethod>,
}

#[derive(Debug, Clone, Default)]
pub struct ReceiverFields<'a> {
    pub date_of_birth: Option<NaiveDate>,
    pub guardian_name: Option<&'a str>,
    pub guardian_contact: Option<&'a str>,
    pub school_class: Option<&'a str>,
    pub interests: Option<&'a str>,
    pub needs: Option<&'a str>,
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

pub async fn sponsor_profile(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
) -> Result<Option<SponsorProfile>> {
    let profile = sqlx::query_as::<_, SponsorProfile>(
        r#"
        SELECT u.user_id, u.first_name, u.last_name, u.email, u.role, u.created_at,
               sp.profile_id, sp.organization, sp.phone, sp.address, sp.city,
               sp.country, sp.preferred_contact_method, sp.profile_image
        FROM   users u
        LEFT JOIN sponsor_profiles sp ON sp.user_id = u.user_id
        WHERE  u.user_id = ?1 AND u.role = ?2
        "#,
    )
    .bind(user_id)
    .bind(Role::Sponsor)
    .fetch_optional(executor)
    .await?;
    Ok(profile)
}

pub async fn receiver_profile(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
) -> Result<Option<ReceiverProfile>> {
    let profile = sqlx::query_as::<_, ReceiverProfile>(
        r#"
        SELECT u.user_id, u.first_name, u.last_name, u.email, u.role, u.created_at,
               rp.profile_id, rp.date_of_birth, rp.guardian_name, rp.guardian_contact,
               rp.school_class, rp.interests, rp.needs, rp.profile_image
        FROM   users u
        LEFT JOIN receiver_profiles rp ON rp.user_id = u.user_id
        WHERE  u.user_id = ?1 AND u.role = ?2
        "#,
    )
    .bind(user_id)
    .bind(Role::Receiver)
    .fetch_optional(executor)
    .await?;
    Ok(profile)
}

/// Active receivers, by first then last name.
pub async fn list_receivers(executor: impl SqliteExecutor<'_>) -> Result<Vec<ReceiverListing>> {
    let rows = sqlx::query_as::<_, ReceiverListing>(
        r#"
        SELECT u.user_id, u.first_name, u.last_name,
               rp.school_class, rp.interests, rp.needs, rp.profile_image
        FROM   users u
        LEFT JOIN receiver_profiles rp ON rp.user_id = u.user_id
        WHERE  u.role = ?1 AND u.is_active = 1
        ORDER  BY u.first_name, u.last_name, u.user_id
        "#,
    )
    .bind(Role::Receiver)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────

/// Replace the sponsor's text fields, creating the row if needed. The image
/// column is left alone.
pub async fn upsert_sponsor_profile(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
    fields: &SponsorFields<'_>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sponsor_profiles
            (user_id, organization, phone, address, city, country, preferred_contact_method)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (user_id) DO UPDATE SET
            organization             = excluded.organization,
            phone                    = excluded.phone,
            address                  = excluded.address,
            city                     = excluded.city,
            country                  = excluded.country,
            preferred_contact_method = excluded.preferred_contact_method
        "#,
    )
    .bind(user_id)
    .bind(fields.organization)
    .bind(fields.phone)
    .bind(fields.address)
    .bind(fields.city)
    .bind(fields.country)
    .bind(fields.preferred_contact_method.unwrap_or(ContactMethod::Email))
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn upsert_receiver_profile(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
    fields: &ReceiverFields<'_>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO receiver_profiles
            (user_id, date_of_birth, guardian_name, guardian_contact, school_class,
             interests, needs)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (user_id) DO UPDATE SET
            date_of_birth    = excluded.date_of_birth,
            guardian_name    = excluded.guardian_name,
            guardian_contact = excluded.guardian_contact,
            school_class     = excluded.school_class,
            interests        = excluded.interests,
            needs            = excluded.needs
        "#,
    )
    .bind(user_id)
    .bind(fields.date_of_birth)
    .bind(fields.guardian_name)
    .bind(fields.guardian_contact)
    .bind(fields.school_class)
    .bind(fields.interests)
    .bind(fields.needs)
    .execute(executor)
    .await?;
    Ok(())
}

/// Point the user's profile at a stored image, creating the row if needed.
pub async fn set_profile_image(
    executor: impl SqliteExecutor<'_>,
    role: Role,
    user_id: i64,
    reference: &str,
) -> Result<()> {
    let sql = match role {
        Role::Sponsor => {
            "INSERT INTO sponsor_profiles (user_id, profile_image) VALUES (?1, ?2) \
             ON CONFLICT (user_id) DO UPDATE SET profile_image = excluded.profile_image"
        }
        _ => {
            "INSERT INTO receiver_profiles (user_id, profile_image) VALUES (?1, ?2) \
             ON CONFLICT (user_id) DO UPDATE SET profile_image = excluded.profile_image"
        }
    };
    sqlx::query(sql)
        .bind(user_id)
        .bind(reference)
        .execute(executor)
        .await?;
    Ok(())
}
