//! Assessment progression endpoints, parent and supervisor tracks.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use sprout_core::{AttemptId, AttemptStatus, CatalogEntry, ChildId, Time, Track, UserId};
use sprout_engine::{Advance, Progress, TransitionOutcome};
use sprout_storage::AttemptDetail;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Parent-track routes, with the supervisor track nested under
/// `/supervisor`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:child_id/:aspect/:user_id/:age_months", get(parent_current))
        .route("/:child_id/:aspect/next", post(parent_next))
        .route("/:child_id/:aspect/not-passed", post(parent_not_passed))
        .route("/retry", post(parent_retry))
        .route("/child/:parent_id/:child_id", get(parent_child_overview))
        .route("/history/:child_id/:aspect", post(history))
        .nest("/supervisor", supervisor_router())
}

fn supervisor_router() -> Router<AppState> {
    Router::new()
        .route(
            "/:child_id/:aspect/:supervisor_id/:age_months",
            get(supervisor_current),
        )
        .route("/:child_id/:aspect/next", post(supervisor_next))
        .route("/not-passed", post(supervisor_not_passed))
        .route("/stats/:supervisor_id", get(roster_stats))
        .route("/stats/:supervisor_id/detailed", get(roster_stats_detailed))
        .route("/child/:supervisor_id/:child_id", get(supervisor_child_latest))
}

/// Wire form of one assessment position. All rank/detail fields are
/// null on the `passed_all` sentinel.
#[derive(Serialize)]
struct AssessmentData {
    attempt_id: Option<AttemptId>,
    child_id: ChildId,
    aspect: String,
    rank: Option<i64>,
    name: Option<String>,
    status: AttemptStatus,
    assessment_date: Option<Time>,
    details: Option<CatalogEntry>,
}

impl AssessmentData {
    fn live(detail: &AttemptDetail) -> Self {
        Self {
            attempt_id: Some(detail.attempt.id),
            child_id: detail.attempt.child_id,
            aspect: detail.attempt.aspect.clone(),
            rank: Some(detail.attempt.rank),
            name: Some(detail.entry.name.clone()),
            status: detail.attempt.status,
            assessment_date: Some(detail.attempt.assessment_date),
            details: Some(detail.entry.clone()),
        }
    }

    fn completed(child_id: ChildId, aspect: &str) -> Self {
        Self {
            attempt_id: None,
            child_id,
            aspect: aspect.to_string(),
            rank: None,
            name: None,
            status: AttemptStatus::PassedAll,
            assessment_date: None,
            details: None,
        }
    }
}

fn progress_response(child_id: ChildId, aspect: &str, progress: Progress) -> Response {
    match progress {
        Progress::Current { created, detail } => {
            let (status, message) = if created {
                (StatusCode::CREATED, "assessment started")
            } else {
                (StatusCode::OK, "assessment in progress")
            };
            (
                status,
                Json(json!({ "message": message, "data": AssessmentData::live(&detail) })),
            )
                .into_response()
        }
        Progress::Completed => (
            StatusCode::OK,
            Json(json!({
                "message": "aspect curriculum complete",
                "data": AssessmentData::completed(child_id, aspect),
            })),
        )
            .into_response(),
    }
}

fn advance_response(child_id: ChildId, aspect: &str, advance: Advance) -> Response {
    match advance {
        Advance::Next(detail) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "next assessment loaded",
                "next_assessment": AssessmentData::live(&detail),
            })),
        )
            .into_response(),
        Advance::Completed => (
            StatusCode::OK,
            Json(json!({
                "message": "passed with no further checkpoints for this aspect",
                "next_assessment": AssessmentData::completed(child_id, aspect),
            })),
        )
            .into_response(),
    }
}

fn transition_response(attempt_id: AttemptId, to: &str, outcome: TransitionOutcome) -> Response {
    let message = if outcome.is_noop() {
        "assessment not found or already completed"
    } else {
        "assessment status updated"
    };

    Json(json!({
        "message": message,
        "updated_attempt_id": attempt_id,
        "status": to,
        "no_op": outcome.is_noop(),
    }))
    .into_response()
}

// === Parent track ===

async fn parent_current(
    State(state): State<AppState>,
    Path((child_id, aspect, user_id, age_months)): Path<(i64, String, i64, u32)>,
) -> ApiResult<Response> {
    let progress = state
        .progression
        .get_or_bootstrap(
            Track::Parent,
            ChildId(child_id),
            &aspect,
            age_months,
            UserId(user_id),
        )
        .await?;

    Ok(progress_response(ChildId(child_id), &aspect, progress))
}

#[derive(Deserialize)]
struct ParentAdvanceRequest {
    attempt_id: AttemptId,
    user_id: UserId,
}

async fn parent_next(
    State(state): State<AppState>,
    Path((child_id, aspect)): Path<(i64, String)>,
    Json(body): Json<ParentAdvanceRequest>,
) -> ApiResult<Response> {
    let advance = state
        .progression
        .advance_on_pass(Track::Parent, body.attempt_id, body.user_id)
        .await?;

    Ok(advance_response(ChildId(child_id), &aspect, advance))
}

#[derive(Deserialize)]
struct AttemptRef {
    attempt_id: AttemptId,
}

async fn parent_not_passed(
    State(state): State<AppState>,
    Path((_child_id, _aspect)): Path<(i64, String)>,
    Json(body): Json<AttemptRef>,
) -> ApiResult<Response> {
    let outcome = state
        .progression
        .mark_not_passed(Track::Parent, body.attempt_id)
        .await?;

    Ok(transition_response(body.attempt_id, "not_passed", outcome))
}

async fn parent_retry(
    State(state): State<AppState>,
    Json(body): Json<AttemptRef>,
) -> ApiResult<Response> {
    let outcome = state.progression.retry_resolve(body.attempt_id).await?;
    Ok(transition_response(body.attempt_id, "passed", outcome))
}

async fn parent_child_overview(
    State(state): State<AppState>,
    Path((parent_id, child_id)): Path<(i64, i64)>,
) -> ApiResult<Json<serde_json::Value>> {
    let parent_id = UserId(parent_id);
    let child_id = ChildId(child_id);

    if !state.store.is_parent_of(parent_id, child_id).await? {
        return Err(ApiError::NotFound("child not found for this parent".into()));
    }

    let child = state
        .store
        .child(child_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("child not found".into()))?;

    let assessments = state.progression.live_state(Track::Parent, child_id).await?;

    Ok(Json(json!({
        "message": "child assessments retrieved",
        "child": child,
        "assessments": assessments,
    })))
}

#[derive(Deserialize)]
struct HistoryRequest {
    parent_id: Option<UserId>,
    supervisor_id: Option<UserId>,
}

/// Assessment history for (child, aspect); the body decides which
/// track and proves the caller's relationship to the child.
async fn history(
    State(state): State<AppState>,
    Path((child_id, aspect)): Path<(i64, String)>,
    Json(body): Json<HistoryRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let child_id = ChildId(child_id);

    let (track, evaluator) = match (body.supervisor_id, body.parent_id) {
        (Some(supervisor_id), _) => {
            if !state.store.is_supervisor_of(supervisor_id, child_id).await? {
                return Err(ApiError::Forbidden(
                    "no access to this child for this supervisor".into(),
                ));
            }
            (Track::Supervisor, Some(supervisor_id))
        }
        (None, Some(parent_id)) => {
            if !state.store.is_parent_of(parent_id, child_id).await? {
                return Err(ApiError::Forbidden(
                    "no access to this child for this parent".into(),
                ));
            }
            (Track::Parent, None)
        }
        (None, None) => {
            return Err(ApiError::Validation(
                "supervisor_id or parent_id is required".into(),
            ));
        }
    };

    let child = state
        .store
        .child(child_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("child not found".into()))?;

    let assessments = state
        .progression
        .history(track, child_id, &aspect, evaluator)
        .await?;

    Ok(Json(json!({
        "message": "assessment history retrieved",
        "child": child,
        "assessments": assessments,
    })))
}

// === Supervisor track ===

async fn supervisor_current(
    State(state): State<AppState>,
    Path((child_id, aspect, supervisor_id, age_months)): Path<(i64, String, i64, u32)>,
) -> ApiResult<Response> {
    let progress = state
        .progression
        .get_or_bootstrap(
            Track::Supervisor,
            ChildId(child_id),
            &aspect,
            age_months,
            UserId(supervisor_id),
        )
        .await?;

    Ok(progress_response(ChildId(child_id), &aspect, progress))
}

#[derive(Deserialize)]
struct SupervisorAdvanceRequest {
    supervisor_attempt_id: AttemptId,
    supervisor_id: UserId,
}

async fn supervisor_next(
    State(state): State<AppState>,
    Path((child_id, aspect)): Path<(i64, String)>,
    Json(body): Json<SupervisorAdvanceRequest>,
) -> ApiResult<Response> {
    let advance = state
        .progression
        .advance_on_pass(Track::Supervisor, body.supervisor_attempt_id, body.supervisor_id)
        .await?;

    Ok(advance_response(ChildId(child_id), &aspect, advance))
}

#[derive(Deserialize)]
struct SupervisorAttemptRef {
    supervisor_attempt_id: AttemptId,
}

async fn supervisor_not_passed(
    State(state): State<AppState>,
    Json(body): Json<SupervisorAttemptRef>,
) -> ApiResult<Response> {
    let outcome = state
        .progression
        .mark_not_passed(Track::Supervisor, body.supervisor_attempt_id)
        .await?;

    Ok(transition_response(
        body.supervisor_attempt_id,
        "not_passed",
        outcome,
    ))
}

async fn roster_stats(
    State(state): State<AppState>,
    Path(supervisor_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let stats = state
        .aggregation
        .roster_stats(UserId(supervisor_id), Utc::now().date_naive())
        .await?;

    Ok(Json(json!({
        "message": "supervisor assessments retrieved",
        "data": stats,
    })))
}

async fn roster_stats_detailed(
    State(state): State<AppState>,
    Path(supervisor_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let rows = state
        .aggregation
        .roster_stats_detailed(UserId(supervisor_id))
        .await?;

    Ok(Json(json!({
        "message": "supervisor assessment breakdown retrieved",
        "data": rows,
    })))
}

async fn supervisor_child_latest(
    State(state): State<AppState>,
    Path((supervisor_id, child_id)): Path<(i64, i64)>,
) -> ApiResult<Json<serde_json::Value>> {
    let supervisor_id = UserId(supervisor_id);
    let child_id = ChildId(child_id);

    if !state.store.is_supervisor_of(supervisor_id, child_id).await? {
        return Err(ApiError::NotFound(
            "child not found for this supervisor".into(),
        ));
    }

    let child = state
        .store
        .child(child_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("child not found".into()))?;

    let assessments = state
        .progression
        .latest_per_aspect(Track::Supervisor, child_id, supervisor_id)
        .await?;

    Ok(Json(json!({
        "message": "latest assessments per aspect retrieved",
        "child": child,
        "assessments": assessments,
    })))
}
