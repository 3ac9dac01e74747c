//! Access-request decisions, the notification inbox and push tokens.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use sprout_core::{ChildId, NotificationId, RequestStatus, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `/api/notifications` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/approve", post(approve_request))
        .route("/deny", post(deny_request))
        .route("/push-token", post(save_push_token))
        .route("/inbox/:user_id", get(list_notifications))
        .route("/:notification_id/read", put(mark_read))
}

#[derive(Deserialize)]
struct DecisionRequest {
    child_id: ChildId,
    supervisor_id: UserId,
    parent_id: UserId,
    notification_id: Option<NotificationId>,
}

async fn approve_request(
    State(state): State<AppState>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let request = state
        .store
        .access_request_for(body.supervisor_id, body.child_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("access request not found".into()))?;

    if request.status != RequestStatus::Pending {
        return Ok(Json(json!({
            "message": "request already decided",
            "no_op": true,
        })));
    }

    let supervisor = state
        .store
        .user(body.supervisor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("supervisor not found".into()))?;

    let parent_message = format!("you approved data access for {}", supervisor.username);
    let supervisor_message = "your access request for the child was approved";

    state
        .store
        .approve_access_request(
            &request,
            body.notification_id,
            &parent_message,
            supervisor_message,
        )
        .await?;

    // Transaction committed; push delivery is best-effort from here.
    if let Some(token) = state.store.push_token(body.supervisor_id).await? {
        state.push.send(&token, supervisor_message).await;
    }

    Ok(Json(json!({
        "message": "access request approved",
        "child_id": body.child_id,
        "supervisor_id": body.supervisor_id,
    })))
}

async fn deny_request(
    State(state): State<AppState>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let request = state
        .store
        .access_request_for(body.supervisor_id, body.child_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("access request not found".into()))?;

    if request.status != RequestStatus::Pending {
        return Ok(Json(json!({
            "message": "request already decided",
            "no_op": true,
        })));
    }

    let supervisor = state
        .store
        .user(body.supervisor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("supervisor not found".into()))?;

    let parent_message = format!("you denied data access for {}", supervisor.username);
    let supervisor_message = "your access request for the child was denied";

    state
        .store
        .deny_access_request(
            &request,
            body.notification_id,
            &parent_message,
            supervisor_message,
        )
        .await?;

    if let Some(token) = state.store.push_token(body.supervisor_id).await? {
        state.push.send(&token, supervisor_message).await;
    }

    Ok(Json(json!({
        "message": "access request denied",
        "child_id": body.child_id,
        "supervisor_id": body.supervisor_id,
    })))
}

#[derive(Deserialize)]
struct PushTokenRequest {
    user_id: UserId,
    token: String,
}

async fn save_push_token(
    State(state): State<AppState>,
    Json(body): Json<PushTokenRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.token.trim().is_empty() {
        return Err(ApiError::Validation("token is required".into()));
    }

    state
        .store
        .upsert_push_token(body.user_id, body.token.trim())
        .await?;

    Ok(Json(json!({ "message": "push token saved" })))
}

async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let notifications = state.store.notifications_for(UserId(user_id)).await?;

    Ok(Json(json!({
        "message": "notifications retrieved",
        "notifications": notifications,
    })))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let updated = state
        .store
        .mark_notification_read(NotificationId(notification_id))
        .await?;

    Ok(Json(json!({
        "message": if updated == 0 { "notification not found" } else { "notification marked read" },
        "no_op": updated == 0,
    })))
}
