//! Request authentication and the shared record-access check.
//!
//! Tokens are issued elsewhere; this module only verifies them. A token
//! carries `{ "user": { "id": .. }, "exp": .. }` and is accepted from the
//! `x-auth-token` header, an `Authorization: Bearer` header, or a `token`
//! query parameter (browsers cannot set headers on an `EventSource`).

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiState;
use crate::db;
use crate::errors::AppError;
use crate::models::{Parties, Role};

pub const AUTH_HEADER: &str = "x-auth-token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUser {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: TokenUser,
    pub exp: usize,
}

/// Verifies HS256 tokens signed with the configured secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {e}");
                AppError::Unauthorized("Token is not valid".to_string())
            })
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Admins may access every record; otherwise the principal must be one of
/// the record's two parties.
pub fn can_access(record: &impl Parties, principal: &Principal) -> bool {
    let (first, second) = record.parties();
    principal.is_admin() || principal.id == first || principal.id == second
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.trim().to_string());
    }
    if let Some(value) = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(value.trim().to_string());
    }
    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.token)
}

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("No token, authorization denied".to_string()))?;
        let claims = state.tokens.verify(&token)?;

        let user = db::users::find_user(&state.pool, claims.user.id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

        Ok(Principal {
            id: user.user_id,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};

    struct Pair(i64, i64);

    impl Parties for Pair {
        fn parties(&self) -> (i64, i64) {
            (self.0, self.1)
        }
    }

    fn principal(id: i64, role: Role) -> Principal {
        Principal {
            id,
            role,
            first_name: "Test".into(),
            last_name: "User".into(),
        }
    }

    fn sign(secret: &[u8], id: i64, exp: usize) -> String {
        let claims = Claims {
            user: TokenUser { id },
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn access_is_limited_to_parties_and_admins() {
        let record = Pair(1, 2);
        assert!(can_access(&record, &principal(1, Role::Sponsor)));
        assert!(can_access(&record, &principal(2, Role::Receiver)));
        assert!(can_access(&record, &principal(99, Role::Admin)));
        assert!(!can_access(&record, &principal(3, Role::Sponsor)));
        assert!(!can_access(&record, &principal(3, Role::Receiver)));
    }

    #[test]
    fn verifier_accepts_own_tokens_only() {
        let verifier = TokenVerifier::new(b"test-secret");
        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;

        let claims = verifier.verify(&sign(b"test-secret", 7, exp)).unwrap();
        assert_eq!(claims.user.id, 7);

        assert!(verifier.verify(&sign(b"other-secret", 7, exp)).is_err());
        assert!(verifier.verify(&sign(b"test-secret", 7, 1_000)).is_err());
        assert!(verifier.verify("garbage").is_err());
    }

    #[test]
    fn token_sources_in_priority_order() {
        let (parts, _) = Request::builder()
            .uri("/api/notifications/stream?token=from-query")
            .header(AUTH_HEADER, "from-header")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(extract_token(&parts).as_deref(), Some("from-header"));

        let (parts, _) = Request::builder()
            .uri("/x")
            .header(AUTHORIZATION, "Bearer abc")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(extract_token(&parts).as_deref(), Some("abc"));

        let (parts, _) = Request::builder()
            .uri("/x?a=1&token=q")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(extract_token(&parts).as_deref(), Some("q"));

        let (parts, _) = Request::builder()
            .uri("/x?token=aa%2Ebb%2Ecc")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(extract_token(&parts).as_deref(), Some("aa.bb.cc"));

        let (parts, _) = Request::builder().uri("/x").body(()).unwrap().into_parts();
        assert_eq!(extract_token(&parts), None);
    }
}
