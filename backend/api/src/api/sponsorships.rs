use std::sync::Arc;

use axum::{
    extract::State,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{created, ApiJson, ApiPath, ApiQuery, ApiState};
use crate::auth::Principal;
use crate::errors::{AppError, Result};
use crate::models::{Role, SponsorshipDetails, SponsorshipSummary};
use crate::registry::{self, CreateSponsorshipRequest};

#[derive(Deserialize)]
struct ListQuery {
    role: Option<String>,
}

#[derive(Deserialize)]
struct StatusBody {
    status: Option<String>,
}

async fn create_sponsorship(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiJson(body): ApiJson<CreateSponsorshipRequest>,
) -> Result<Response> {
    let id = registry::create_sponsorship(&state.pool, &state.push, &principal, body).await?;
    Ok(created(
        "Sponsorship created successfully",
        "sponsorshipId",
        id,
    ))
}

/// `GET /api/sponsorships?role=sponsor|receiver`
async fn list_sponsorships(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<SponsorshipSummary>>> {
    let role = match query.role.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            Role::parse(raw).ok_or_else(|| AppError::invalid("role", "Unknown role"))?,
        ),
    };
    Ok(Json(
        registry::sponsorships_for(&state.pool, &principal, role).await?,
    ))
}

async fn list_as_sponsor(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Vec<SponsorshipSummary>>> {
    Ok(Json(
        registry::sponsorships_for(&state.pool, &principal, Some(Role::Sponsor)).await?,
    ))
}

async fn list_as_receiver(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Vec<SponsorshipSummary>>> {
    Ok(Json(
        registry::sponsorships_for(&state.pool, &principal, Some(Role::Receiver)).await?,
    ))
}

async fn get_sponsorship(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SponsorshipDetails>> {
    Ok(Json(
        registry::sponsorship_by_id(&state.pool, id, &principal).await?,
    ))
}

async fn update_status(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<StatusBody>,
) -> Result<Json<Value>> {
    let status = registry::update_status(
        &state.pool,
        id,
        body.status.as_deref(),
        &principal,
        state.strict_status_transitions,
    )
    .await?;
    Ok(Json(json!({
        "message": "Sponsorship status updated successfully",
        "status": status,
    })))
}

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", post(create_sponsorship).get(list_sponsorships))
        .route("/sponsor", get(list_as_sponsor))
        .route("/receiver", get(list_as_receiver))
        .route("/:id", get(get_sponsorship))
        .route("/:id/status", put(update_status))
}
