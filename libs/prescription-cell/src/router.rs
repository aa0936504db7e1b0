use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn prescription_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/add", post(handlers::add_prescription))
        .route("/patient/{patient_id}", get(handlers::patient_prescriptions))
        .route("/cost/{prescription_number}", get(handlers::prescription_cost))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
