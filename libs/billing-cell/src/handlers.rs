use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{InsuranceQuery, PriceQuery, ProcessBillQuery};
use crate::services::BillingService;

#[axum::debug_handler]
pub async fn process_bill(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    axum_extra::extract::Query(query): axum_extra::extract::Query<ProcessBillQuery>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    debug!("User {} processing a bill with {} treatments", user.id, query.treatments.len());
    let service = BillingService::new(&config);
    let bill = service
        .process_bill(query.patient_id, query.doctor_id, &query.treatments, auth.token())
        .await?;
    Ok((StatusCode::CREATED, Json(json!(bill))))
}

#[axum::debug_handler]
pub async fn update_price(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&config);
    let recalculated = service
        .update_price(&query.treatment, query.price, auth.token())
        .await?;

    Ok(Json(json!({
        "message": "Price updated",
        "recalculated": recalculated
    })))
}

#[axum::debug_handler]
pub async fn add_price(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<PriceQuery>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BillingService::new(&config);
    let act = service
        .add_medical_act(&query.treatment, query.price, auth.token())
        .await?;
    Ok((StatusCode::CREATED, Json(json!(act))))
}

#[axum::debug_handler]
pub async fn price_list(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&config);
    let prices = service.price_list(auth.token()).await?;
    Ok(Json(json!(prices)))
}

#[axum::debug_handler]
pub async fn total_revenue(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&config);
    let revenue = service.total_revenue(auth.token()).await?;
    Ok(Json(json!({ "totalRevenue": revenue })))
}

#[axum::debug_handler]
pub async fn pending_bills(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&config);
    let ids = service.pending_bill_ids(auth.token()).await?;
    Ok(Json(json!(ids)))
}

#[axum::debug_handler]
pub async fn insurance_coverage(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<InsuranceQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&config);
    let coverage = service
        .insurance_coverage(query.amount, query.policy_number.as_deref(), auth.token())
        .await?;

    Ok(Json(json!({
        "amount": query.amount,
        "coverage": coverage
    })))
}

#[axum::debug_handler]
pub async fn get_bill(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(bill_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&config);
    let bill = service.get_bill(&bill_number, auth.token()).await?;
    Ok(Json(json!(bill)))
}

#[axum::debug_handler]
pub async fn verify_integrity(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(bill_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&config);
    let valid = service.verify_integrity(&bill_number, auth.token()).await?;

    Ok(Json(json!({
        "billNumber": bill_number,
        "valid": valid
    })))
}

#[axum::debug_handler]
pub async fn mark_paid(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(bill_number): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&config);
    let bill = service.mark_paid(&bill_number, auth.token()).await?;
    Ok(Json(json!(bill)))
}
