//! Fixtures shared by the unit tests.

use sqlx::SqlitePool;

use crate::auth::Principal;
use crate::db;
use crate::models::Role;

pub struct Cast {
    pub sponsor: Principal,
    pub receiver: Principal,
    pub admin: Principal,
    /// A second sponsor with no stake in anything the others create.
    pub outsider: Principal,
}

pub async fn principal(pool: &SqlitePool, first: &str, last: &str, role: Role) -> Principal {
    let email = format!("{}.{}@example.org", first.to_lowercase(), last.to_lowercase());
    let id = db::users::insert_user(pool, first, last, &email, role)
        .await
        .unwrap();
    Principal {
        id,
        role,
        first_name: first.to_string(),
        last_name: last.to_string(),
    }
}

pub async fn cast(pool: &SqlitePool) -> Cast {
    Cast {
        sponsor: principal(pool, "Sam", "Sponsor", Role::Sponsor).await,
        receiver: principal(pool, "Rita", "Receiver", Role::Receiver).await,
        admin: principal(pool, "Ada", "Admin", Role::Admin).await,
        outsider: principal(pool, "Otto", "Outsider", Role::Sponsor).await,
    }
}
