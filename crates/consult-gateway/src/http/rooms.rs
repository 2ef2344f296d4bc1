//! `/rooms` (§4.8): admin visibility and bulk cleanup over the room-service
//! control plane. No interaction with the session table — this operates on
//! rooms that may have outlived their session row.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use consult_voice_bridge::RoomInfo;

use crate::app::AppState;
use crate::http::error::ApiError;

#[derive(Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomView>,
}

#[derive(Serialize)]
pub struct RoomView {
    pub name: String,
    pub sid: String,
    pub num_participants: u32,
}

impl From<RoomInfo> for RoomView {
    fn from(r: RoomInfo) -> Self {
        Self { name: r.name, sid: r.sid, num_participants: r.num_participants }
    }
}

pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Result<Json<RoomsResponse>, ApiError> {
    let rooms = state.room_service.list_rooms().await?;
    Ok(Json(RoomsResponse { rooms: rooms.into_iter().map(RoomView::from).collect() }))
}

#[derive(Serialize)]
pub struct DeleteAllResponse {
    pub deleted: usize,
    pub failed: usize,
}

pub async fn delete_all_rooms(State(state): State<Arc<AppState>>) -> Result<Json<DeleteAllResponse>, ApiError> {
    let rooms = state.room_service.list_rooms().await?;
    let mut deleted = 0;
    let mut failed = 0;
    for room in rooms {
        match state.room_service.delete_room(&room.name).await {
            Ok(()) => deleted += 1,
            Err(e) => {
                warn!(error = %e, room = %room.name, "failed to delete room");
                failed += 1;
            }
        }
    }
    Ok(Json(DeleteAllResponse { deleted, failed }))
}
