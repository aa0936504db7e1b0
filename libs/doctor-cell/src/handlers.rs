use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::CreateDoctorRequest;
use crate::services::DoctorService;

#[axum::debug_handler]
pub async fn create_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = DoctorService::new(&config);
    let doctor = service.create_doctor(request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);
    let doctors = service.list_doctors(auth.token()).await?;
    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);
    let doctor = service.get_doctor(doctor_id, auth.token()).await?;
    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_doctor_by_number(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);
    let doctor = service.get_by_number(&doctor_number, auth.token()).await?;
    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn doctors_by_specialization(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(specialization): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);
    let doctors = service.by_specialization(&specialization, auth.token()).await?;
    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn doctors_by_department(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(department): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);
    let doctors = service.by_department(&department, auth.token()).await?;
    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    tracing::info!("User {} deleting doctor {}", user.id, doctor_id);
    let service = DoctorService::new(&config);
    service.delete_doctor(doctor_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}
