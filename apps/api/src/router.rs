use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::scheduling_routes;
use billing_cell::router::billing_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::{history_routes, patient_routes};
use prescription_cell::router::prescription_routes;
use room_cell::router::room_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital API is running!" }))
        .nest("/scheduling", scheduling_routes(state.clone()))
        .nest("/rooms", room_routes(state.clone()))
        .nest("/billing", billing_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/patient-history", history_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/prescriptions", prescription_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use http::{Request, StatusCode};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_is_public() {
        let app = create_router(TestConfig::default().to_arc());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Hospital API is running!");
    }

    #[tokio::test]
    async fn cell_routes_require_a_token() {
        for uri in ["/billing/prices", "/rooms", "/doctors", "/prescriptions/cost/RX1"] {
            let app = create_router(TestConfig::default().to_arc());
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
