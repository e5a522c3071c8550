//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::errors::{AppError, Result};

/// Status changes are unconstrained unless strict mode is switched on.
pub const STRICT_STATUS_TRANSITIONS_DEFAULT: bool = false;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path or URL of the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// HS256 secret used to verify `x-auth-token` JWTs
    pub jwt_secret: Vec<u8>,
    /// Directory where uploaded proof images are written
    pub upload_dir: PathBuf,
    /// Largest accepted proof image, in bytes
    pub max_upload_bytes: usize,
    /// When true, status changes must follow the lifecycle table; otherwise
    /// any authorized party may set any status
    pub strict_status_transitions: bool,
    /// Buffer size of the live notification channel
    pub push_channel_capacity: usize,
    /// Maximum number of pooled SQLite connections
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./sponsor_bridge.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid API_PORT".to_string()))?,
            jwt_secret: env_var("JWT_SECRET")
                .map_err(|_| {
                    AppError::Config("JWT_SECRET environment variable is required".to_string())
                })
                .and_then(|raw| decode_secret(&raw))?,
            upload_dir: env_var("UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".to_string())
                .into(),
            max_upload_bytes: env_var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (5 * 1024 * 1024).to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid MAX_UPLOAD_BYTES".to_string()))?,
            strict_status_transitions: parse_bool(
                "STRICT_STATUS_TRANSITIONS",
                env_var("STRICT_STATUS_TRANSITIONS").ok(),
                STRICT_STATUS_TRANSITIONS_DEFAULT,
            )?,
            push_channel_capacity: env_var("PUSH_CHANNEL_CAPACITY")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid PUSH_CHANNEL_CAPACITY".to_string()))?,
            db_max_connections: env_var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid DB_MAX_CONNECTIONS".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| AppError::Config(format!("Missing env var: {key}")))
}

/// Accepts a base64-encoded secret, falling back to the raw bytes of the value.
fn decode_secret(raw: &str) -> Result<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Config("JWT_SECRET cannot be empty".to_string()));
    }
    Ok(BASE64
        .decode(trimmed)
        .unwrap_or_else(|_| trimmed.as_bytes().to_vec()))
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some(_) => Err(AppError::Config(format!("Invalid {key}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_accepts_base64_and_raw_text() {
        assert_eq!(decode_secret("c2VjcmV0").unwrap(), b"secret".to_vec());
        assert_eq!(
            decode_secret("not base64!").unwrap(),
            b"not base64!".to_vec()
        );
        assert!(decode_secret("   ").is_err());
    }

    #[test]
    fn bool_flags() {
        assert!(parse_bool("X", None, true).unwrap());
        assert!(!parse_bool("X", Some("false".into()), true).unwrap());
        assert!(parse_bool("X", Some("on".into()), false).unwrap());
        assert!(parse_bool("X", Some("maybe".into()), false).is_err());
    }

    #[test]
    fn status_transitions_are_unconstrained_unless_opted_in() {
        let unset = parse_bool(
            "STRICT_STATUS_TRANSITIONS",
            None,
            STRICT_STATUS_TRANSITIONS_DEFAULT,
        )
        .unwrap();
        assert!(!unset);
        let opted_in = parse_bool(
            "STRICT_STATUS_TRANSITIONS",
            Some("true".into()),
            STRICT_STATUS_TRANSITIONS_DEFAULT,
        )
        .unwrap();
        assert!(opted_in);
    }
}
