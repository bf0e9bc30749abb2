//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::RoomCode,
    infrastructure::dto::http::{HealthDto, RoomDetailDto, RoomSummaryDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}

/// Get list of live rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let mut summaries = Vec::new();
    for room in state.hub.list_rooms().await {
        // A room may close between listing and snapshotting.
        if let Some(snapshot) = room.snapshot().await {
            summaries.push(RoomSummaryDto::from(&snapshot));
        }
    }
    Json(summaries)
}

/// Get room detail by code
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let code = RoomCode::new(code).map_err(|_| StatusCode::NOT_FOUND)?;
    let room = state
        .hub
        .get_room(&code)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = room.snapshot().await.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(RoomDetailDto::from(&snapshot)))
}
