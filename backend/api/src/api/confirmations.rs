use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use super::uploads::{body_limit, is_multipart, read_form};
use super::{created, ApiJson, ApiPath, ApiState};
use crate::auth::Principal;
use crate::coordinator::{self, CreateConfirmationRequest};
use crate::errors::{AppError, Result};
use crate::models::ConfirmationDetails;
use crate::uploads::PROOF_FIELD;

/// Build the request from a multipart form whose `proofImage` part is
/// stored on the way in. Returns the stored reference separately so it can
/// be discarded if the confirmation is refused.
async fn from_form(
    state: &ApiState,
    multipart: Multipart,
) -> Result<(CreateConfirmationRequest, Option<String>)> {
    let form = read_form(multipart, &state.images, PROOF_FIELD).await?;
    let sponsorship_id = match form.text("sponsorshipId").map(str::parse::<i64>) {
        None => None,
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            if let Some(reference) = &form.file {
                state.images.discard(reference).await;
            }
            return Err(AppError::invalid(
                "sponsorshipId",
                "Sponsorship ID must be an integer",
            ));
        }
    };
    let request = CreateConfirmationRequest {
        sponsorship_id,
        notes: form.text("notes").map(str::to_string),
        proof_image: form.file.clone(),
    };
    Ok((request, form.file))
}

/// `POST /api/confirmations` with a JSON body or a multipart form.
async fn create_confirmation(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    request: Request,
) -> Result<Response> {
    let (body, uploaded) = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::invalid(PROOF_FIELD, e.body_text()))?;
        from_form(&state, multipart).await?
    } else {
        let ApiJson(body) = ApiJson::<CreateConfirmationRequest>::from_request(request, &state).await?;
        if let Some(reference) = body.proof_image.as_deref().map(str::trim) {
            if !reference.is_empty() {
                state.images.check_reference(PROOF_FIELD, reference).await?;
            }
        }
        (body, None)
    };

    let outcome = coordinator::create_confirmation(
        &state.pool,
        &state.push,
        &principal,
        body,
        state.strict_status_transitions,
    )
    .await;
    let id = match outcome {
        Ok(id) => id,
        Err(e) => {
            if let Some(reference) = uploaded {
                state.images.discard(&reference).await;
            }
            return Err(e);
        }
    };
    Ok(created(
        "Sponsorship confirmed successfully",
        "confirmationId",
        id,
    ))
}

async fn confirmation_for_sponsorship(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(sponsorship_id): ApiPath<i64>,
) -> Result<Json<ConfirmationDetails>> {
    Ok(Json(
        coordinator::confirmation_for(&state.pool, sponsorship_id, &principal).await?,
    ))
}

pub fn router(max_upload_bytes: usize) -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", post(create_confirmation))
        .route("/sponsorship/:id", get(confirmation_for_sponsorship))
        .layer(body_limit(max_upload_bytes))
}
