use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::ApiState;
use crate::auth::Principal;
use crate::errors::{AppError, Result};
use crate::uploads::{ImageStore, PROOF_FIELD};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub(super) fn body_limit(max_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_bytes + MULTIPART_OVERHEAD)
}

pub(super) fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// A multipart form with at most one image stored under `file_field`.
#[derive(Debug, Default)]
pub(super) struct UploadForm {
    pub texts: HashMap<String, String>,
    pub file: Option<String>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Read every part of `multipart`, storing the image part as it arrives.
/// A stored file is discarded again if a later part fails.
pub(super) async fn read_form(
    mut multipart: Multipart,
    images: &ImageStore,
    file_field: &str,
) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    if let Err(e) = collect_parts(&mut multipart, images, file_field, &mut form).await {
        if let Some(reference) = form.file.take() {
            images.discard(&reference).await;
        }
        return Err(e);
    }
    Ok(form)
}

async fn collect_parts(
    multipart: &mut Multipart,
    images: &ImageStore,
    file_field: &str,
    form: &mut UploadForm,
) -> Result<()> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid(file_field, e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name != file_field {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::invalid(&name, e.body_text()))?;
            form.texts.insert(name, text);
            continue;
        }
        if form.file.is_some() {
            return Err(AppError::invalid(file_field, "Only one file may be uploaded"));
        }
        let file_name = field.file_name().map(str::to_string);
        // Reject by name before buffering the body.
        images.validate(file_field, file_name.as_deref(), 1)?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::invalid(file_field, e.body_text()))?;
        form.file = Some(images.store(file_field, file_name.as_deref(), &bytes).await?);
    }
    Ok(())
}

/// `POST /api/uploads/proof`
async fn upload_proof(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    multipart: Multipart,
) -> Result<Response> {
    let form = read_form(multipart, &state.images, PROOF_FIELD).await?;
    let reference = form
        .file
        .ok_or_else(|| AppError::invalid(PROOF_FIELD, "No file uploaded"))?;

    tracing::debug!("User {} uploaded proof {reference}", principal.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Proof image uploaded successfully",
            "proofImage": reference,
        })),
    )
        .into_response())
}

pub fn router(max_bytes: usize) -> Router<Arc<ApiState>> {
    Router::new()
        .route("/proof", post(upload_proof))
        .layer(body_limit(max_bytes))
}
