//! Domain enums and the record shapes stored in / read from the database.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Role carried by every authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Sponsor,
    Receiver,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sponsor" => Some(Self::Sponsor),
            "receiver" => Some(Self::Receiver),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sponsor => "sponsor",
            Self::Receiver => "receiver",
            Self::Admin => "admin",
        }
    }
}

/// Lifecycle status of a sponsorship.
///
/// ```text
/// Pending ──► Active ─────► Completed
///    └──────► Confirmed ──►┘
/// (any) ──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SponsorshipStatus {
    Pending,
    Active,
    Confirmed,
    Completed,
    Cancelled,
}

impl SponsorshipStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Active,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(&self, next: Self) -> bool {
        use SponsorshipStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (*self, next),
            (Pending, Active)
                | (Pending, Confirmed)
                | (Active, Completed)
                | (Confirmed, Completed)
                | (_, Cancelled)
        )
    }
}

/// Payment cadence of a sponsorship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Frequency {
    #[serde(rename = "one-time")]
    #[sqlx(rename = "one-time")]
    OneTime,
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "one-time" => Some(Self::OneTime),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "annually" => Some(Self::Annually),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReportType {
    Sponsorship,
    Financial,
    Activity,
}

/// Records that name two parties: the initiating side and the counterpart.
pub trait Parties {
    fn parties(&self) -> (i64, i64);
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sponsorship {
    pub sponsorship_id: i64,
    pub sponsor_id: i64,
    pub receiver_id: i64,
    /// Canonical decimal text, e.g. `"50"` or `"12.5"`.
    pub amount: String,
    pub currency: String,
    pub purpose: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub frequency: Frequency,
    pub status: SponsorshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Parties for Sponsorship {
    fn parties(&self) -> (i64, i64) {
        (self.sponsor_id, self.receiver_id)
    }
}

/// A sponsorship as listed for one of its parties.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SponsorshipSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sponsorship: Sponsorship,
    pub counterpart_name: String,
    pub confirmation_id: Option<i64>,
    pub confirmation_date: Option<DateTime<Utc>>,
    pub proof_image: Option<String>,
}

/// A single sponsorship with both parties' names and its confirmation, if any.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SponsorshipDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sponsorship: Sponsorship,
    pub sponsor_name: String,
    pub receiver_name: String,
    pub confirmation_id: Option<i64>,
    pub confirmation_date: Option<DateTime<Utc>>,
    pub proof_image: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Confirmation {
    pub confirmation_id: i64,
    pub sponsorship_id: i64,
    pub confirmed_by: i64,
    pub proof_image: Option<String>,
    pub notes: Option<String>,
    pub confirmation_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConfirmationDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub confirmation: Confirmation,
    pub confirmer_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub notification_id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub message_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub subject: Option<String>,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Parties for Message {
    fn parties(&self) -> (i64, i64) {
        (self.sender_id, self.receiver_id)
    }
}

/// A message as listed in an inbox or outbox.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub message: Message,
    pub counterpart_name: String,
    pub counterpart_role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: String,
    pub sender_role: Role,
    pub receiver_name: String,
    pub receiver_role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub report_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub generated_by: i64,
    pub report_type: ReportType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportRecord {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: Report,
    pub generator_name: String,
}

/// How a sponsor prefers to be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContactMethod {
    Email,
    Phone,
    System,
}

impl ContactMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// A sponsor's account joined with their profile; profile fields are null
/// until the sponsor first saves one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SponsorProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub profile_id: Option<i64>,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub preferred_contact_method: Option<ContactMethod>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReceiverProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub profile_id: Option<i64>,
    pub date_of_birth: Option<NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_contact: Option<String>,
    pub school_class: Option<String>,
    pub interests: Option<String>,
    pub needs: Option<String>,
    pub profile_image: Option<String>,
}

/// One entry of the receiver directory sponsors browse.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReceiverListing {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub school_class: Option<String>,
    pub interests: Option<String>,
    pub needs: Option<String>,
    pub profile_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_and_as_str_agree() {
        for status in SponsorshipStatus::ALL {
            assert_eq!(SponsorshipStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SponsorshipStatus::parse("archived"), None);
    }

    #[test]
    fn lifecycle_transitions() {
        use SponsorshipStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Active.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Pending));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Active));
        assert!(!Confirmed.can_transition_to(Active));
    }

    #[test]
    fn frequency_literals() {
        assert_eq!(Frequency::parse("one-time"), Some(Frequency::OneTime));
        assert_eq!(Frequency::parse("annually"), Some(Frequency::Annually));
        assert_eq!(Frequency::parse("weekly"), None);
        assert_eq!(
            serde_json::to_value(Frequency::OneTime).unwrap(),
            serde_json::json!("one-time")
        );
    }

    #[test]
    fn contact_method_literals() {
        assert_eq!(ContactMethod::parse("system"), Some(ContactMethod::System));
        assert_eq!(ContactMethod::parse("fax"), None);
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::Receiver.as_str(), "receiver");
        assert_eq!(Role::parse("guest"), None);
    }
}
