use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::uploads::{body_limit, read_form};
use super::{done, ApiJson, ApiPath, ApiState};
use crate::auth::Principal;
use crate::errors::{AppError, Result};
use crate::models::{ReceiverListing, ReceiverProfile, Role, SponsorProfile};
use crate::profiles::{self, ReceiverProfileUpdate, SponsorProfileUpdate};
use crate::uploads::PROFILE_FIELD;

/// Store the `profileImage` part and attach it to the caller's `role` profile.
async fn upload_image(
    state: &ApiState,
    principal: &Principal,
    role: Role,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let reference = read_form(multipart, &state.images, PROFILE_FIELD)
        .await?
        .file
        .ok_or_else(|| AppError::invalid(PROFILE_FIELD, "No image file provided"))?;
    if let Err(e) = profiles::set_profile_image(&state.pool, principal, role, &reference).await {
        state.images.discard(&reference).await;
        return Err(e);
    }
    Ok(Json(json!({
        "message": "Profile image uploaded successfully",
        "filename": reference,
    })))
}

// ─────────────────────────────────────────────────────────
// /api/sponsors
// ─────────────────────────────────────────────────────────

async fn own_sponsor_profile(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<SponsorProfile>> {
    Ok(Json(
        profiles::sponsor_profile(&state.pool, None, &principal).await?,
    ))
}

async fn sponsor_profile(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<SponsorProfile>> {
    Ok(Json(
        profiles::sponsor_profile(&state.pool, Some(user_id), &principal).await?,
    ))
}

async fn update_sponsor_profile(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiJson(body): ApiJson<SponsorProfileUpdate>,
) -> Result<Json<Value>> {
    profiles::update_sponsor_profile(&state.pool, &principal, body).await?;
    Ok(done("Profile updated successfully"))
}

async fn upload_sponsor_image(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    multipart: Multipart,
) -> Result<Json<Value>> {
    upload_image(&state, &principal, Role::Sponsor, multipart).await
}

pub fn sponsors_router(max_upload_bytes: usize) -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/profile",
            get(own_sponsor_profile).put(update_sponsor_profile),
        )
        .route("/profile/image", post(upload_sponsor_image))
        .route("/profile/:id", get(sponsor_profile))
        .layer(body_limit(max_upload_bytes))
}

// ─────────────────────────────────────────────────────────
// /api/receivers
// ─────────────────────────────────────────────────────────

/// `GET /api/receivers`
async fn list_receivers(
    State(state): State<Arc<ApiState>>,
    _principal: Principal,
) -> Result<Json<Vec<ReceiverListing>>> {
    Ok(Json(profiles::list_receivers(&state.pool).await?))
}

async fn own_receiver_profile(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<ReceiverProfile>> {
    Ok(Json(
        profiles::receiver_profile(&state.pool, None, &principal).await?,
    ))
}

async fn receiver_profile(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<ReceiverProfile>> {
    Ok(Json(
        profiles::receiver_profile(&state.pool, Some(user_id), &principal).await?,
    ))
}

async fn update_receiver_profile(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiJson(body): ApiJson<ReceiverProfileUpdate>,
) -> Result<Json<Value>> {
    profiles::update_receiver_profile(&state.pool, &principal, body).await?;
    Ok(done("Profile updated successfully"))
}

async fn upload_receiver_image(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    multipart: Multipart,
) -> Result<Json<Value>> {
    upload_image(&state, &principal, Role::Receiver, multipart).await
}

pub fn receivers_router(max_upload_bytes: usize) -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(list_receivers))
        .route(
            "/profile",
            get(own_receiver_profile).put(update_receiver_profile),
        )
        .route("/profile/image", post(upload_receiver_image))
        .route("/profile/:id", get(receiver_profile))
        .layer(body_limit(max_upload_bytes))
}
