use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, SessionError};
use crate::layout::CellEdit;
use crate::middleware::StaffToken;
use crate::models::{SessionDraft, SessionQuery};
use crate::services::sessions::{self, SessionPlan};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_sessions))
        .route("/sessions/{id}", put(update_session).delete(delete_session))
}

/// Зал из бэкенда + первый тариф, если правкам мест он понадобится.
async fn plan_for(state: &AppState, token: &StaffToken, draft: &SessionDraft) -> Result<SessionPlan, AppError> {
    let fields = sessions::validate_draft(draft)?;
    let room = state
        .backend
        .find_room(token, &fields.room_id)
        .await?
        .ok_or(SessionError::UnknownRoom(fields.room_id))?;

    let needs_fallback = draft
        .seat_edits
        .iter()
        .any(|edit| matches!(edit.edit(), Ok(CellEdit::Pricing(None))));
    let fallback = if needs_fallback {
        state.backend.list_pricing(token).await?.into_iter().next().map(|tier| tier.id)
    } else {
        None
    };

    SessionPlan::prepare(draft, &room, fallback.as_deref())
}

// POST /api/sessions
async fn create_sessions(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Json(draft): Json<SessionDraft>,
) -> Result<impl IntoResponse, AppError> {
    let plan = plan_for(&state, &token, &draft).await?;
    let report = sessions::create_sessions(&state.backend, &token, &plan).await;

    let status = if report.is_complete() {
        StatusCode::CREATED
    } else if report.created > 0 {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::BAD_GATEWAY
    };

    Ok((status, Json(json!({ "success": report.is_complete(), "report": report }))))
}

// PUT /api/sessions/{id}
async fn update_session(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Path(id): Path<String>,
    Json(draft): Json<SessionDraft>,
) -> Result<impl IntoResponse, AppError> {
    let plan = plan_for(&state, &token, &draft).await?;
    let session = sessions::update_session(&state.backend, &token, &id, &plan).await?;

    Ok(Json(json!({ "success": true, "session": session })))
}

// DELETE /api/sessions/{id}
async fn delete_session(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.backend.delete_session(&token, &id).await?;
    tracing::info!("Session {} deleted", id);

    Ok(Json(json!({ "success": true })))
}

// GET /api/sessions?page=&limit=&status=&from=&to=
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.backend.list_sessions(&token, &query).await?;

    Ok(Json(json!({
        "success": true,
        "sessions": page.items,
        "pagination": page.pagination
    })))
}
