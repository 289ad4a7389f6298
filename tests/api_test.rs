//! HTTP API end-to-end tests driving the router in-process

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{setup, TestEnv, TEST_PASSWORD};
use lyceum_core::api::{router, AppState};
use lyceum_core::types::Role;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(env: &TestEnv) -> Router {
    router(AppState::new(env.lms.clone()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_login_and_me() {
    let env = setup().await;
    let app = app(&env);

    let (status, user) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "New@Example.com", "name": "Newcomer", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "new@example.com");
    assert_eq!(user["role"], "STUDENT");

    // Same address again
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "new@example.com", "name": "Again", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let token = login(&app, "new@example.com").await;
    let (status, me) = send(&app, Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Newcomer");

    let (status, _) = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_credentials_are_rejected() {
    let env = setup().await;
    let app = app(&env);
    env.user("Sam", Role::Student).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "sam@example.com", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/me", Some("not-a-session"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_course_flow_over_http() {
    let env = setup().await;
    let app = app(&env);
    env.user("Ines", Role::Instructor).await;
    env.user("Sam", Role::Student).await;
    let instructor = login(&app, "ines@example.com").await;
    let student = login(&app, "sam@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/courses",
        Some(&student),
        Some(json!({ "title": "Not mine" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, course) = send(
        &app,
        Method::POST,
        "/courses",
        Some(&instructor),
        Some(json!({ "title": "HTTP Basics", "description": "Requests and responses" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(course["status"], "DRAFT");
    let course_id = course["id"].as_str().unwrap().to_string();

    // Publishing an empty course is refused
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/courses/{}/publish", course_id),
        Some(&instructor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, module) = send(
        &app,
        Method::POST,
        &format!("/courses/{}/modules", course_id),
        Some(&instructor),
        Some(json!({ "title": "Week 1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let module_id = module["id"].as_str().unwrap().to_string();

    let (status, lesson) = send(
        &app,
        Method::POST,
        &format!("/modules/{}/lessons", module_id),
        Some(&instructor),
        Some(json!({
            "title": "Status codes",
            "content": { "kind": "text", "body": "2xx means success" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let lesson_id = lesson["id"].as_str().unwrap().to_string();

    let (status, published) = send(
        &app,
        Method::POST,
        &format!("/courses/{}/publish", course_id),
        Some(&instructor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "PUBLISHED");

    // Anonymous catalog
    let (status, catalog) = send(&app, Method::GET, "/courses", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(catalog.as_array().unwrap().len(), 1);

    let enroll_uri = format!("/courses/{}/enroll", course_id);
    let (status, outcome) = send(&app, Method::POST, &enroll_uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["created"], true);
    let (status, outcome) = send(&app, Method::POST, &enroll_uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["created"], false);

    let (status, completion) = send(
        &app,
        Method::POST,
        &format!("/lessons/{}/complete", lesson_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completion["enrollment"]["progress"], 100);
    assert_eq!(completion["course_completed"], true);

    let (status, board) = send(
        &app,
        Method::GET,
        &format!("/courses/{}/leaderboard", course_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["name"], "Sam");
    assert_eq!(board[0]["points"], 110);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/courses/{}/stats", course_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stats) = send(
        &app,
        Method::GET,
        &format!("/courses/{}/stats", course_id),
        Some(&instructor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["completed"], 1);
}

#[tokio::test]
async fn test_unknown_course_is_not_found() {
    let env = setup().await;
    let app = app(&env);
    env.user("Sam", Role::Student).await;
    let token = login(&app, "sam@example.com").await;

    let uri = format!("/courses/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_health() {
    let env = setup().await;
    let app = app(&env);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_event_stream_requires_session() {
    let env = setup().await;
    let app = app(&env);
    env.user("Sam", Role::Student).await;

    let (status, body) = send(&app, Method::GET, "/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    // The stream never ends, so only the response head is inspected
    let token = login(&app, "sam@example.com").await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/events")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}
