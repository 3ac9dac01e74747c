//! Room CRUD and the room-scoped cascade delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use sprout_core::{RoomId, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `/api/rooms` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_room).get(list_rooms))
        .route("/children", get(room_children))
        .route("/:room_id/:supervisor_id", put(update_room).delete(delete_room))
}

#[derive(Deserialize)]
struct AddRoomRequest {
    supervisor_id: UserId,
    name: String,
    color: Option<String>,
    picture: Option<String>,
}

async fn add_room(
    State(state): State<AppState>,
    Json(body): Json<AddRoomRequest>,
) -> ApiResult<Response> {
    if body.name.trim().is_empty() {
        return Err(ApiError::Validation("room name is required".into()));
    }

    let room = state
        .store
        .insert_room(
            body.supervisor_id,
            body.name.trim(),
            body.picture.as_deref(),
            body.color.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "room added successfully", "room": room })),
    )
        .into_response())
}

#[derive(Deserialize)]
struct SupervisorQuery {
    supervisor_id: UserId,
}

async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<SupervisorQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let rooms = state.store.rooms_of_supervisor(query.supervisor_id).await?;

    Ok(Json(json!({
        "message": "rooms retrieved",
        "rooms": rooms,
    })))
}

#[derive(Deserialize)]
struct RoomChildrenQuery {
    room_id: RoomId,
    supervisor_id: UserId,
}

async fn room_children(
    State(state): State<AppState>,
    Query(query): Query<RoomChildrenQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let room = state
        .store
        .room_owned_by(query.room_id, query.supervisor_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("room not found or not managed by this supervisor".into())
        })?;

    let children = state.store.children_in_room(room.id).await?;

    Ok(Json(json!({
        "message": "children retrieved",
        "room": room,
        "children": children,
    })))
}

#[derive(Deserialize)]
struct UpdateRoomRequest {
    name: Option<String>,
    picture: Option<String>,
}

async fn update_room(
    State(state): State<AppState>,
    Path((room_id, supervisor_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateRoomRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let room_id = RoomId(room_id);
    let supervisor_id = UserId(supervisor_id);

    if state
        .store
        .room_owned_by(room_id, supervisor_id)
        .await?
        .is_none()
    {
        return Err(ApiError::Forbidden(
            "you do not have permission to update this room".into(),
        ));
    }

    state
        .store
        .update_room(
            room_id,
            supervisor_id,
            body.name.as_deref(),
            body.picture.as_deref(),
        )
        .await?;

    let room = state.store.room_owned_by(room_id, supervisor_id).await?;

    Ok(Json(json!({
        "message": "room updated successfully",
        "room": room,
    })))
}

async fn delete_room(
    State(state): State<AppState>,
    Path((room_id, supervisor_id)): Path<(i64, i64)>,
) -> ApiResult<Json<serde_json::Value>> {
    let room_id = RoomId(room_id);
    let supervisor_id = UserId(supervisor_id);

    if state
        .store
        .room_owned_by(room_id, supervisor_id)
        .await?
        .is_none()
    {
        return Err(ApiError::Forbidden(
            "you do not have permission to delete this room".into(),
        ));
    }

    state.store.delete_room_cascade(room_id).await?;

    Ok(Json(json!({
        "message": "room and related data deleted successfully",
    })))
}
