use std::sync::Arc;

use axum::{
    extract::State,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use super::{created, done, ApiJson, ApiPath, ApiState};
use crate::auth::Principal;
use crate::errors::Result;
use crate::messaging::{self, SendMessageRequest};
use crate::models::{MessageDetails, MessageSummary};

async fn send_message(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> Result<Response> {
    let id = messaging::send(&state.pool, &state.push, &principal, body).await?;
    Ok(created("Message sent successfully", "messageId", id))
}

async fn received(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Vec<MessageSummary>>> {
    Ok(Json(messaging::received(&state.pool, &principal).await?))
}

async fn sent(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Vec<MessageSummary>>> {
    Ok(Json(messaging::sent(&state.pool, &principal).await?))
}

async fn unread_count(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Value>> {
    let count = messaging::unread_count(&state.pool, &principal).await?;
    Ok(Json(json!({ "count": count })))
}

async fn get_message(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageDetails>> {
    Ok(Json(messaging::get(&state.pool, id, &principal).await?))
}

async fn mark_read(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    messaging::mark_read(&state.pool, id, &principal).await?;
    Ok(done("Message marked as read"))
}

async fn delete_message(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    messaging::delete(&state.pool, id, &principal).await?;
    Ok(done("Message deleted"))
}

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", post(send_message))
        .route("/received", get(received))
        .route("/sent", get(sent))
        .route("/unread-count", get(unread_count))
        .route("/:id", get(get_message).delete(delete_message))
        .route("/:id/read", put(mark_read))
}
