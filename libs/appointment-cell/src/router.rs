use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointment", post(handlers::schedule_appointment))
        .route("/available-slots", get(handlers::available_slots))
        .route("/doctors/{doctor_id}/appointments", get(handlers::doctor_appointments))
        .route("/patients/{patient_id}/appointments", get(handlers::patient_appointments))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
