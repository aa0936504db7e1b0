use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn patient_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_patients).post(create_patient))
        .route("/{id}", get(get_patient).put(update_patient).delete(delete_patient))
        .route("/{id}/insurance", get(list_insurance).post(add_insurance))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

pub fn history_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(add_history_entry))
        .route("/search", get(search_history))
        .route("/patient/{id}", get(patient_history))
        .route("/patient/{id}/summary", get(patient_summary))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
