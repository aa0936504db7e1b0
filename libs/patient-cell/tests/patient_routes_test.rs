use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::router::{history_routes, patient_routes};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig};

async fn call(router: Router, bearer: &str, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, bearer);

    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn new_patient_body(patient_number: &str) -> Value {
    json!({
        "patient_number": patient_number,
        "first_name": "Jane",
        "last_name": "Doe",
        "date_of_birth": "1985-04-12",
        "gender": "F",
        "address": "12 Harbour Road",
        "phone_number": "0612345678",
        "email": "jane.doe@example.com"
    })
}

#[tokio::test]
async fn creating_patient_with_invalid_gender_never_reaches_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = TestConfig::default().with_supabase(server.uri());
    let bearer = JwtTestUtils::bearer_for(&config);

    let mut body = new_patient_body("P-100");
    body["gender"] = json!("M");

    let (status, response) = call(patient_routes(config.to_arc()), &bearer, Method::POST, "/", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Gender must be either 'H' or 'F'");
}

#[tokio::test]
async fn duplicate_patient_number_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("patient_number", "eq.P-100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&Uuid::new_v4().to_string(), "P-100")
        ])))
        .mount(&server)
        .await;

    let config = TestConfig::default().with_supabase(server.uri());
    let bearer = JwtTestUtils::bearer_for(&config);

    let (status, response) = call(
        patient_routes(config.to_arc()),
        &bearer,
        Method::POST,
        "/",
        Some(new_patient_body("P-100")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Patient number P-100 already exists");
}

#[tokio::test]
async fn create_patient_returns_created_row() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!({ "patient_number": "P-200", "gender": "F" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::patient_row(&id, "P-200")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::default().with_supabase(server.uri());
    let bearer = JwtTestUtils::bearer_for(&config);

    let (status, response) = call(
        patient_routes(config.to_arc()),
        &bearer,
        Method::POST,
        "/",
        Some(new_patient_body("P-200")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["id"], json!(id));
}

#[tokio::test]
async fn update_rejects_bad_phone_number() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&id, "P-300")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = TestConfig::default().with_supabase(server.uri());
    let bearer = JwtTestUtils::bearer_for(&config);

    let (status, _) = call(
        patient_routes(config.to_arc()),
        &bearer,
        Method::PUT,
        &format!("/{}", id),
        Some(json!({ "phone_number": "12345" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn negative_insurance_terms_are_rejected() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&id, "P-400")
        ])))
        .mount(&server)
        .await;

    let config = TestConfig::default().with_supabase(server.uri());
    let bearer = JwtTestUtils::bearer_for(&config);

    let (status, response) = call(
        patient_routes(config.to_arc()),
        &bearer,
        Method::POST,
        &format!("/{}/insurance", id),
        Some(json!({
            "policy_number": "POL-9",
            "provider": "Mutual Health",
            "coverage_percentage": -5.0,
            "max_coverage": 100.0,
            "expiry_date": "2030-01-01"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Coverage percentage cannot be negative");
}

#[tokio::test]
async fn summary_counts_visits_and_sums_bills() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&id, "P-500")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bills"))
        .and(query_param("select", "total_amount"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "total_amount": 120.5 },
            { "total_amount": 540.0 }
        ])))
        .mount(&server)
        .await;

    let config = TestConfig::default().with_supabase(server.uri());
    let bearer = JwtTestUtils::bearer_for(&config);

    let (status, response) = call(
        history_routes(config.to_arc()),
        &bearer,
        Method::GET,
        &format!("/patient/{}/summary", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["visit_count"], 3);
    assert_eq!(response["total_billed"], 660.5);
}

#[tokio::test]
async fn history_search_forwards_keyword_filter() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_history"))
        .and(query_param(
            "or",
            "(diagnosis.ilike.*asthma*,symptoms.ilike.*asthma*,notes.ilike.*asthma*)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::history_row(&patient_id, "2024-02-10", "Asthma")
        ])))
        .mount(&server)
        .await;

    let config = TestConfig::default().with_supabase(server.uri());
    let bearer = JwtTestUtils::bearer_for(&config);

    let (status, response) = call(
        history_routes(config.to_arc()),
        &bearer,
        Method::GET,
        "/search?keyword=asthma",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response[0]["diagnosis"], "Asthma");
}

#[tokio::test]
async fn history_search_quotes_keyword_with_commas() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_history"))
        .and(query_param(
            "or",
            "(diagnosis.ilike.\"*fever, (mild)*\",symptoms.ilike.\"*fever, (mild)*\",notes.ilike.\"*fever, (mild)*\")",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::history_row(&patient_id, "2024-02-10", "Fever, (mild)")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::default().with_supabase(server.uri());
    let bearer = JwtTestUtils::bearer_for(&config);

    let (status, response) = call(
        history_routes(config.to_arc()),
        &bearer,
        Method::GET,
        "/search?keyword=fever%2C%20%28mild%29",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response[0]["diagnosis"], "Fever, (mild)");
}
