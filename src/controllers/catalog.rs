use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::StaffToken;
use crate::models::{PricingRequest, SessionTimeRequest};
use crate::AppState;

/// Справочники, нужные формам залов и сеансов: тарифы и временные слоты.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pricing", get(list_pricing).post(create_pricing))
        .route("/pricing/{id}", put(update_pricing).delete(delete_pricing))
        .route("/session-times", get(list_session_times).post(create_session_time))
        .route("/session-times/{id}", put(update_session_time).delete(delete_session_time))
}

/* ---------- тарифы ---------- */

async fn list_pricing(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
) -> Result<impl IntoResponse, AppError> {
    let pricing = state.backend.list_pricing(&token).await?;
    Ok(Json(json!({ "success": true, "pricing": pricing })))
}

async fn create_pricing(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Json(req): Json<PricingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = req.into_payload()?;
    let tier = state.backend.create_pricing(&token, &payload).await?;
    tracing::info!("Pricing '{}' created at {}", payload.name, payload.price);

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "pricing": tier }))))
}

async fn update_pricing(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Path(id): Path<String>,
    Json(req): Json<PricingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = req.into_payload()?;
    let tier = state.backend.update_pricing(&token, &id, &payload).await?;
    tracing::info!("Pricing {} updated", id);

    Ok(Json(json!({ "success": true, "pricing": tier })))
}

async fn delete_pricing(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.backend.delete_pricing(&token, &id).await?;
    tracing::info!("Pricing {} deleted", id);

    Ok(Json(json!({ "success": true })))
}

/* ---------- временные слоты ---------- */

async fn list_session_times(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
) -> Result<impl IntoResponse, AppError> {
    let mut times = state.backend.list_session_times(&token).await?;
    times.sort_by(|a, b| a.time.cmp(&b.time));
    Ok(Json(json!({ "success": true, "sessionTimes": times })))
}

async fn create_session_time(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Json(req): Json<SessionTimeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = req.validated()?;
    let slot = state.backend.create_session_time(&token, &payload).await?;
    tracing::info!("Session time {} created", payload.time);

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "sessionTime": slot }))))
}

async fn update_session_time(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Path(id): Path<String>,
    Json(req): Json<SessionTimeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = req.validated()?;
    let slot = state.backend.update_session_time(&token, &id, &payload).await?;
    tracing::info!("Session time {} updated", id);

    Ok(Json(json!({ "success": true, "sessionTime": slot })))
}

async fn delete_session_time(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.backend.delete_session_time(&token, &id).await?;
    tracing::info!("Session time {} deleted", id);

    Ok(Json(json!({ "success": true })))
}
