use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateHistoryRequest, CreateInsuranceRequest, CreatePatientRequest, HistorySearchQuery,
    UpdatePatientRequest,
};
use crate::services::{HistoryService, InsuranceService, PatientService};

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("User {} registering patient {}", user.id, request.patient_number);
    let service = PatientService::new(&config);
    let patient = service.create_patient(request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patients = service.list_patients(auth.token()).await?;
    Ok(Json(json!(patients)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service.get_patient(patient_id, auth.token()).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service.update_patient(patient_id, request, auth.token()).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = PatientService::new(&config);
    service.delete_patient(patient_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_insurance(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<CreateInsuranceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = InsuranceService::new(&config);
    let policy = service.add_insurance(patient_id, request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(json!(policy))))
}

#[axum::debug_handler]
pub async fn list_insurance(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = InsuranceService::new(&config);
    let policies = service.policies_for_patient(patient_id, auth.token()).await?;
    Ok(Json(json!(policies)))
}

#[axum::debug_handler]
pub async fn add_history_entry(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateHistoryRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = HistoryService::new(&config);
    let entry = service.add_entry(request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(json!(entry))))
}

#[axum::debug_handler]
pub async fn search_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<HistorySearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = HistoryService::new(&config);
    let entries = service.search(query, auth.token()).await?;
    Ok(Json(json!(entries)))
}

#[axum::debug_handler]
pub async fn patient_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = HistoryService::new(&config);
    let entries = service.entries_for_patient(patient_id, auth.token()).await?;
    Ok(Json(json!(entries)))
}

#[axum::debug_handler]
pub async fn patient_summary(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = HistoryService::new(&config);
    let summary = service.summary(patient_id, auth.token()).await?;
    Ok(Json(json!(summary)))
}
