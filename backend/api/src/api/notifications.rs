use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Response,
    },
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::Stream;
use tracing::{debug, error};

use super::{created, done, ApiJson, ApiPath, ApiQuery, ApiState};
use crate::auth::Principal;
use crate::errors::Result;
use crate::inbox::{self, CreateNotificationRequest};
use crate::models::Notification;

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<i64>,
    #[serde(default)]
    unread: bool,
}

async fn list_notifications(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(
        inbox::list(&state.pool, &principal, query.limit, query.unread).await?,
    ))
}

async fn unread_count(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Value>> {
    let count = inbox::unread_count(&state.pool, &principal).await?;
    Ok(Json(json!({ "count": count })))
}

async fn mark_read(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    inbox::mark_read(&state.pool, id, &principal).await?;
    Ok(done("Notification marked as read"))
}

async fn mark_all_read(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Value>> {
    let updated = inbox::mark_all_read(&state.pool, &principal).await?;
    Ok(Json(json!({
        "message": "All notifications marked as read",
        "updated": updated,
    })))
}

async fn create_notification(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiJson(body): ApiJson<CreateNotificationRequest>,
) -> Result<Response> {
    let notification = inbox::create(&state.pool, &state.push, &principal, body).await?;
    Ok(created(
        "Notification sent successfully",
        "notificationId",
        notification.notification_id,
    ))
}

async fn delete_notification(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    inbox::delete(&state.pool, id, &principal).await?;
    Ok(done("Notification deleted"))
}

/// `GET /api/notifications/stream`
///
/// Server-sent `notification` events addressed to the caller.
async fn stream_notifications(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let user_id = principal.id;
    debug!("User {user_id} subscribed to live notifications");

    let receiver = BroadcastStream::new(state.push.subscribe());
    let stream = tokio_stream::StreamExt::filter_map(receiver, move |envelope| match envelope {
        Ok(envelope) if envelope.user_id == user_id => {
            match Event::default()
                .event("notification")
                .json_data(&envelope.notification)
            {
                Ok(event) => Some(Ok(event)),
                Err(err) => {
                    error!(
                        "Failed to serialize notification {}: {err}",
                        envelope.notification.notification_id
                    );
                    None
                }
            }
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!("Live stream for user {user_id} skipped {skipped} notifications");
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(list_notifications).post(create_notification))
        .route("/unread-count", get(unread_count))
        .route("/mark-all-read", put(mark_all_read))
        .route("/stream", get(stream_notifications))
        .route("/:id", delete(delete_notification))
        .route("/:id/read", put(mark_read))
}
