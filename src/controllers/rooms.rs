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
use crate::models::RoomRequest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{id}", put(update_room).delete(delete_room))
}

// GET /api/rooms
async fn list_rooms(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
) -> Result<impl IntoResponse, AppError> {
    let rooms = state.backend.list_rooms(&token).await?;

    Ok(Json(json!({
        "success": true,
        "count": rooms.len(),
        "rooms": rooms
    })))
}

// POST /api/rooms
async fn create_room(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Json(req): Json<RoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = req.into_payload()?;
    let room = state.backend.create_room(&token, &payload).await?;
    tracing::info!("Room '{}' created with capacity {}", payload.name, payload.layout.capacity);

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "room": room }))))
}

// PUT /api/rooms/{id}
async fn update_room(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Path(id): Path<String>,
    Json(req): Json<RoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = req.into_payload()?;
    let room = state.backend.update_room(&token, &id, &payload).await?;
    tracing::info!("Room {} updated", id);

    Ok(Json(json!({ "success": true, "room": room })))
}

// DELETE /api/rooms/{id}
async fn delete_room(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.backend.delete_room(&token, &id).await?;
    tracing::info!("Room {} deleted", id);

    Ok(Json(json!({ "success": true })))
}
