use crate::auth::AuthUser;
use crate::error::Result;
use crate::http::AppState;
use crate::room::RoomSnapshot;
use crate::signaling::ws_handler;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use onair_core::{Role, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub room_id: RoomId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub room_id: RoomId,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopRoomResponse {
    pub room_id: RoomId,
    pub live: bool,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/rooms/{room_id}", get(get_room))
        .route("/rooms/{room_id}/join", post(join_room))
        .route("/rooms/{room_id}/stop", post(stop_room))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn create_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreateRoomResponse>)> {
    let room_id = state.coordinator.create_room(req.room_id, &user).await?;
    Ok((StatusCode::CREATED, Json(CreateRoomResponse { room_id })))
}

async fn list_rooms(State(state): State<AppState>, _user: AuthUser) -> Json<Vec<RoomId>> {
    Json(state.coordinator.list_rooms())
}

async fn get_room(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>> {
    let snapshot = state.coordinator.room_snapshot(&RoomId::from(room_id))?;
    Ok(Json(snapshot))
}

async fn join_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(room_id): Path<String>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>> {
    let room_id = RoomId::from(room_id);
    state
        .coordinator
        .authorize_join(&room_id, &user, req.role)
        .await?;
    Ok(Json(JoinRoomResponse {
        room_id,
        role: req.role,
    }))
}

async fn stop_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<StopRoomResponse>> {
    let room_id = RoomId::from(room_id);
    state.coordinator.stop_as_owner(&room_id, &user).await?;
    Ok(Json(StopRoomResponse {
        room_id,
        live: false,
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "rooms": state.coordinator.registry().len(),
        "connections": state.signaling.connection_count(),
    }))
}
