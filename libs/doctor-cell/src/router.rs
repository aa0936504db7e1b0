use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors).post(handlers::create_doctor))
        .route("/{doctor_id}", get(handlers::get_doctor).delete(handlers::delete_doctor))
        .route("/number/{doctor_number}", get(handlers::get_doctor_by_number))
        .route("/specialization/{specialization}", get(handlers::doctors_by_specialization))
        .route("/department/{department}", get(handlers::doctors_by_department))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
