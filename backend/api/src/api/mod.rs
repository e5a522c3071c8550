//! Axum REST API: shared state, extractors and the router.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::errors::AppError;
use crate::push::PushHub;
use crate::uploads::ImageStore;

mod confirmations;
mod messages;
mod notifications;
mod profiles;
mod reports;
mod sponsorships;
mod uploads;

pub struct ApiState {
    pub pool: SqlitePool,
    pub tokens: TokenVerifier,
    pub push: PushHub,
    pub images: ImageStore,
    pub strict_status_transitions: bool,
}

impl ApiState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            tokens: TokenVerifier::new(&config.jwt_secret),
            push: PushHub::new(config.push_channel_capacity),
            images: ImageStore::new(config.upload_dir.clone(), config.max_upload_bytes),
            strict_status_transitions: config.strict_status_transitions,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────

/// JSON body whose rejections render as validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections render as validation errors.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters whose rejections render as validation errors.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `201 Created` with `{ message, <key>: id }`.
pub(crate) fn created(message: &str, key: &str, id: impl Serialize) -> Response {
    let mut body = json!({ "message": message });
    body[key] = json!(id);
    (StatusCode::CREATED, Json(body)).into_response()
}

pub(crate) fn done(message: &str) -> Json<Value> {
    Json(json!({ "message": message }))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn app_router(state: Arc<ApiState>) -> Router {
    let max_upload_bytes = state.images.max_bytes();
    let api = Router::new()
        .nest("/sponsorships", sponsorships::router())
        .nest("/confirmations", confirmations::router(max_upload_bytes))
        .nest("/notifications", notifications::router())
        .nest("/messages", messages::router())
        .nest("/reports", reports::router())
        .nest("/sponsors", profiles::sponsors_router(max_upload_bytes))
        .nest("/receivers", profiles::receivers_router(max_upload_bytes))
        .nest("/uploads", uploads::router(max_upload_bytes));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
