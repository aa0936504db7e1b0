use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::AddPrescriptionRequest;
use crate::services::PrescriptionService;

#[axum::debug_handler]
pub async fn add_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<AddPrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PrescriptionService::new(&config);
    let issued = service.add_prescription(request, auth.token()).await?;

    let number = &issued.prescription.prescription_number;
    let message = match issued.bill_number {
        Some(_) => format!("Prescription {} created and billed", number),
        None => format!("Prescription {} created", number),
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": message,
            "billNumber": issued.bill_number,
            "prescription": issued.prescription
        })),
    ))
}

#[axum::debug_handler]
pub async fn patient_prescriptions(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&config);
    let prescriptions = service.patient_prescriptions(patient_id, auth.token()).await?;
    Ok(Json(json!(prescriptions)))
}

#[axum::debug_handler]
pub async fn prescription_cost(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(prescription_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&config);
    let total = service.prescription_cost(&prescription_number, auth.token()).await?;
    Ok(Json(json!({ "totalCost": total })))
}
