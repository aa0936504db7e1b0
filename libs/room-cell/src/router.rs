use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn room_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_rooms).post(handlers::create_room))
        .route("/assign/{appointment_id}", post(handlers::assign_room))
        .route("/availability/{room_number}", get(handlers::room_availability))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
