//! Child registration and parent roster endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use sprout_core::{RequestStatus, Role, RoomId, Track, UserId};
use sprout_storage::NewChild;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `/api/children` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_child).get(list_children))
        .route("/supervisor", post(add_child_supervisor))
}

#[derive(Deserialize)]
struct AddChildRequest {
    parent_id: UserId,
    first_name: String,
    last_name: String,
    nick_name: Option<String>,
    birthday: NaiveDate,
    gender: Option<String>,
    picture: Option<String>,
}

async fn add_child(
    State(state): State<AppState>,
    Json(body): Json<AddChildRequest>,
) -> ApiResult<Response> {
    if body.first_name.trim().is_empty() || body.last_name.trim().is_empty() {
        return Err(ApiError::Validation("required fields are missing".into()));
    }

    let exists = state
        .store
        .child_exists_for_parent(
            body.parent_id,
            body.first_name.trim(),
            body.last_name.trim(),
            body.birthday,
        )
        .await?;
    if exists {
        return Err(ApiError::Conflict("child already exists".into()));
    }

    let child_id = state
        .store
        .insert_child(
            body.parent_id,
            &NewChild {
                first_name: body.first_name.trim(),
                last_name: body.last_name.trim(),
                nick_name: body.nick_name.as_deref(),
                birthday: body.birthday,
                gender: body.gender.as_deref(),
                picture: body.picture.as_deref(),
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "child added successfully",
            "child_id": child_id,
        })),
    )
        .into_response())
}

#[derive(Deserialize)]
struct ListChildrenQuery {
    parent_id: UserId,
}

/// A parent's children, each with their live parent-track assessments.
async fn list_children(
    State(state): State<AppState>,
    Query(query): Query<ListChildrenQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let children = state.store.children_of_parent(query.parent_id).await?;

    let mut payload = Vec::with_capacity(children.len());
    for child in children {
        let assessments = state.progression.live_state(Track::Parent, child.id).await?;
        payload.push(json!({ "child": child, "assessments": assessments }));
    }

    Ok(Json(json!({
        "message": "children retrieved",
        "parent_id": query.parent_id,
        "children": payload,
    })))
}

#[derive(Deserialize)]
struct AddChildSupervisorRequest {
    supervisor_id: UserId,
    room_id: RoomId,
    first_name: String,
    last_name: String,
    birthday: NaiveDate,
}

/// A supervisor "adding" a child resolves the existing profile and
/// files an access request with the parent instead of inserting.
async fn add_child_supervisor(
    State(state): State<AppState>,
    Json(body): Json<AddChildSupervisorRequest>,
) -> ApiResult<Response> {
    let supervisor = state
        .store
        .user(body.supervisor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("supervisor not found".into()))?;
    if supervisor.role != Role::Supervisor {
        return Err(ApiError::Forbidden("only supervisors can add children".into()));
    }

    let child = state
        .store
        .find_child_by_identity(
            body.first_name.trim(),
            body.last_name.trim(),
            body.birthday,
        )
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(
                "child not registered; ask the parent to add the child first".into(),
            )
        })?;

    if let Some(existing) = state
        .store
        .access_request_for(body.supervisor_id, child.id)
        .await?
    {
        if existing.status == RequestStatus::Pending {
            return Ok(Json(json!({
                "message": "access request already sent, waiting for approval",
            }))
            .into_response());
        }
    }

    let parent_id = state
        .store
        .parent_of_child(child.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("no parent linked to this child".into()))?;

    state
        .store
        .insert_access_request(parent_id, body.supervisor_id, child.id, body.room_id)
        .await?;

    let message = format!(
        "{} requests access to {} {}'s assessment data",
        supervisor.username, child.first_name, child.last_name
    );
    state
        .store
        .insert_notification(
            parent_id,
            &message,
            Some(body.supervisor_id),
            Some(child.id),
            1,
        )
        .await?;

    // Best-effort push to the parent; delivery failures never fail the
    // request.
    if let Some(token) = state.store.push_token(parent_id).await? {
        state.push.send(&token, &message).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("access request sent to parent for child {} {}",
                child.first_name, child.last_name),
        })),
    )
        .into_response())
}
