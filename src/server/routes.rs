// REST routes. Provider failures never surface as 5xx: they show up as
// empty results or a 422 for drafts.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::location::LocationReport;
use crate::models::{LocalEvent, UserPreferences};
use crate::pipeline::Mode;
use crate::session::{DraftEdits, SessionError, Snapshot};

// ---- Request/Response types ----

#[derive(Deserialize)]
pub struct SearchBody {
    pub query: String,
}

#[derive(Deserialize)]
pub struct ForYouBody {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct DistanceBody {
    pub max_distance_km: Option<f64>,
}

#[derive(Deserialize)]
pub struct DraftBody {
    pub text: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub event_count: usize,
    pub mode: Mode,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let status = match err {
            SessionError::UnknownEvent(_) => StatusCode::NOT_FOUND,
            SessionError::InvalidDistance => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::NoPendingDraft => StatusCode::CONFLICT,
        };
        api_error(status, err.to_string())
    }
}

// ---- Route registration ----

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/events", get(get_events))
        .route("/api/filters/distance", put(set_distance))
        .route("/api/search", post(search).delete(clear_search))
        .route("/api/for-you", put(set_for_you))
        .route("/api/events/{id}/like", post(toggle_like))
        .route("/api/preferences", get(get_preferences))
        .route("/api/location", post(report_location))
        .route("/api/events/draft", post(draft_event).delete(discard_draft))
        .route("/api/events/draft/commit", post(commit_draft))
}

// ---- Handlers ----

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        name: "LocalPulse".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        event_count: state.event_count(),
        mode: state.snapshot().mode,
    })
}

async fn get_events(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.snapshot())
}

async fn set_distance(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DistanceBody>,
) -> Result<Json<Snapshot>, ApiError> {
    Ok(Json(state.set_max_distance(body.max_distance_km)?))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> Json<Snapshot> {
    Json(state.search(&body.query).await)
}

async fn clear_search(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.clear_search())
}

async fn set_for_you(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForYouBody>,
) -> Json<Snapshot> {
    Json(state.set_for_you(body.enabled).await)
}

async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserPreferences>, ApiError> {
    Ok(Json(state.toggle_like(&id).await?))
}

async fn get_preferences(State(state): State<Arc<AppState>>) -> Json<UserPreferences> {
    Json(state.preferences())
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    Json(report): Json<LocationReport>,
) -> Json<Snapshot> {
    Json(state.report_location(report))
}

async fn draft_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DraftBody>,
) -> Result<Json<LocalEvent>, ApiError> {
    state
        .draft_event(&body.text)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::UNPROCESSABLE_ENTITY, "could not interpret event"))
}

async fn discard_draft(State(state): State<Arc<AppState>>) -> StatusCode {
    state.discard_draft();
    StatusCode::NO_CONTENT
}

async fn commit_draft(
    State(state): State<Arc<AppState>>,
    Json(edits): Json<DraftEdits>,
) -> Result<(StatusCode, Json<LocalEvent>), ApiError> {
    let event = state.commit_draft(edits)?;
    Ok((StatusCode::CREATED, Json(event)))
}
