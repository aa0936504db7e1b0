use std::sync::Arc;

use axum::{middleware, routing::{get, post, put}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn billing_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/process", post(handlers::process_bill))
        .route("/price", put(handlers::update_price).post(handlers::add_price))
        .route("/prices", get(handlers::price_list))
        .route("/revenue", get(handlers::total_revenue))
        .route("/pending", get(handlers::pending_bills))
        .route("/insurance", get(handlers::insurance_coverage))
        .route("/bills/{bill_number}", get(handlers::get_bill))
        .route("/bills/{bill_number}/integrity", get(handlers::verify_integrity))
        .route("/bills/{bill_number}/pay", post(handlers::mark_paid))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
