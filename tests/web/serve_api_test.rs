use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request as HttpRequest, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlmend::generator::{FixedGenerator, GenerateParams, GenerationError, GenerationResult, SqlGenerator};
use sqlmend::web::{router, AppState};
use sqlmend::Pipeline;
use std::sync::Arc;
use tower::ServiceExt;

struct SlowGenerator;

#[async_trait]
impl SqlGenerator for SlowGenerator {
    async fn generate(&self, _params: &GenerateParams) -> GenerationResult<String> {
        Err(GenerationError::Timeout(30))
    }
}

fn app(generator: impl SqlGenerator + 'static) -> axum::Router {
    router(Arc::new(AppState::new(Pipeline::default(), Arc::new(generator))))
}

async fn post(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let request = HttpRequest::builder()
        .method(Method::POST)
        .uri("/nl-to-sql")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_home() {
    let request = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
    let response = app(FixedGenerator::new("SELECT 1")).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"message": "NL-to-SQL API is running!"}));
}

#[tokio::test]
async fn test_translate_ok() {
    let (status, body) = post(
        app(FixedGenerator::new("SELECT T1.name FROM users AS T1 LIMIT 10")),
        json!({"question": "list users", "schema": "users(id, name)"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"sql_query": "SELECT name FROM users;"}));
}

#[tokio::test]
async fn test_default_schema_listing() {
    let (status, body) = post(app(FixedGenerator::new("")), json!({"question": "show tables"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"sql_query": "SELECT 'users', 'orders', 'products' AS table_names;"})
    );
}

#[tokio::test]
async fn test_missing_question() {
    let (status, body) = post(app(FixedGenerator::new("SELECT 1")), json!({"schema": "users(id)"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Please provide the 'question' field."}));
}

#[tokio::test]
async fn test_invalid_query_is_bad_request() {
    let (status, body) = post(
        app(FixedGenerator::new("SELECT nickname FROM users")),
        json!({"question": "user nicknames", "schema": "users(id, name)"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Error: Column 'nickname' does not exist in table 'users' → Query: SELECT nickname FROM users;"
    );
}

#[tokio::test]
async fn test_generation_failure_status() {
    let (status, body) = post(
        app(FixedGenerator::new("  ")),
        json!({"question": "list users", "schema": "users(id, name)"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to generate SQL query: "));

    let (status, _) = post(
        app(SlowGenerator),
        json!({"question": "list users", "schema": "users(id, name)"}),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}
