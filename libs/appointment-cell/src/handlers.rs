use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AvailableSlotsQuery, ScheduleAppointmentQuery};
use crate::services::SchedulingService;

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ScheduleAppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    tracing::debug!("User {} scheduling an appointment", user.id);
    let service = SchedulingService::new(&config);
    let appointment = service.schedule_appointment(query, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment scheduled successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn available_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);
    let slots = service
        .available_slots(query.doctor_id, query.date, auth.token())
        .await?;
    Ok(Json(json!(slots)))
}

#[axum::debug_handler]
pub async fn doctor_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);
    let appointments = service.doctor_appointments(doctor_id, auth.token()).await?;
    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn patient_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&config);
    let appointments = service.patient_appointments(patient_id, auth.token()).await?;
    Ok(Json(json!(appointments)))
}
