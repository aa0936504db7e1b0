use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::CreateRoomRequest;
use crate::services::RoomService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoomQuery {
    pub room_number: String,
}

#[axum::debug_handler]
pub async fn assign_room(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<AssignRoomQuery>,
) -> Result<Json<Value>, AppError> {
    let service = RoomService::new(&config);
    service
        .assign_appointment(appointment_id, &query.room_number, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Room assigned successfully"
    })))
}

#[axum::debug_handler]
pub async fn room_availability(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(room_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = RoomService::new(&config);
    let availability = service.availability(&room_number, auth.token()).await?;
    Ok(Json(json!(availability)))
}

#[axum::debug_handler]
pub async fn create_room(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = RoomService::new(&config);
    let room = service.create_room(request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(json!(room))))
}

#[axum::debug_handler]
pub async fn list_rooms(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = RoomService::new(&config);
    let rooms = service.list_rooms(auth.token()).await?;
    Ok(Json(json!(rooms)))
}
