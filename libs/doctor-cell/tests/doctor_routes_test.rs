use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig};

struct TestApp {
    router: Router,
    bearer: String,
}

impl TestApp {
    fn new(server: &MockServer) -> Self {
        let config = TestConfig::default().with_supabase(server.uri());
        Self {
            bearer: JwtTestUtils::bearer_for(&config),
            router: doctor_routes(config.to_arc()),
        }
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, &self.bearer);

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lookup_by_number_returns_doctor() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("doctor_number", "eq.D42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&doctor_id, "D42", "CARDIOLOGIST")
        ])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app.call(Method::GET, "/number/D42", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(doctor_id));
    assert_eq!(body["specialization"], "CARDIOLOGIST");
}

#[tokio::test]
async fn unknown_doctor_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app
        .call(Method::GET, &format!("/{}", Uuid::new_v4()), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Doctor not found");
}

#[tokio::test]
async fn duplicate_doctor_number_is_a_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("doctor_number", "eq.D1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&Uuid::new_v4().to_string(), "D1", "SURGEON")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app
        .call(
            Method::POST,
            "/",
            Some(json!({
                "doctor_number": "D1",
                "first_name": "Cristina",
                "last_name": "Yang",
                "specialization": "SURGEON",
                "department": "Cardiothoracic",
                "phone_number": "0611111111",
                "email": "yang@hospital.com"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Doctor number D1 already exists");
}

#[tokio::test]
async fn create_doctor_persists_row() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&doctor_id, "D7", "SURGEON")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app
        .call(
            Method::POST,
            "/",
            Some(json!({
                "doctor_number": "D7",
                "first_name": "Gregory",
                "last_name": "House",
                "specialization": "SURGEON",
                "department": "Diagnostics",
                "phone_number": "0698765432",
                "email": "d7@hospital.com"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["doctor_number"], "D7");
}

#[tokio::test]
async fn filters_by_department() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("department", "eq.Diagnostics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&Uuid::new_v4().to_string(), "D1", "GENERAL"),
            MockSupabaseResponses::doctor_row(&Uuid::new_v4().to_string(), "D2", "SURGEON")
        ])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server);
    let (status, body) = app.call(Method::GET, "/department/Diagnostics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}
