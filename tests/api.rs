//! HTTP surface tests: router + extractors over the in-memory store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use karma_ledger::auth::Claims;
use karma_ledger::config::Config;
use karma_ledger::engine::ExpPolicy;
use karma_ledger::models::TargetKind;
use karma_ledger::store::{MemoryStore, ReputationStore};
use karma_ledger::{AppState, create_app};

const JWT_SECRET: &str = "test-secret";

fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        allowed_origins: vec!["http://localhost:3000".to_string()],
        exp_upvote: 5,
        exp_downvote: -2,
    }
}

fn test_app(store: MemoryStore) -> Router {
    let state = AppState {
        store: Arc::new(store),
        policy: ExpPolicy {
            upvote: 5,
            downvote: -2,
        },
        config: Arc::new(test_config()),
    };
    create_app(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn voting_requires_authentication() {
    let app = test_app(MemoryStore::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/posts/{}/vote", Uuid::new_v4()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"polarity": "up"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cast_and_read_back_a_vote() {
    let store = MemoryStore::new();
    let author = Uuid::new_v4();
    let voter = Uuid::new_v4();
    store.add_user(voter).await;
    let post_id = store.add_content(TargetKind::Post, author).await;

    let app = test_app(store);
    let token = Claims::new(voter, JWT_SECRET).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/posts/{}/vote", post_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(r#"{"polarity": "up"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_vote"], "up");
    assert_eq!(body["score"], 1);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/posts/{}/vote", post_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_vote"], "up");
    assert_eq!(body["score"], 1);
}

#[tokio::test]
async fn invalid_polarity_never_reaches_storage() {
    let store = MemoryStore::new();
    let author = Uuid::new_v4();
    let voter = Uuid::new_v4();
    store.add_user(voter).await;
    let post_id = store.add_content(TargetKind::Post, author).await;

    let app = test_app(store.clone());
    let token = Claims::new(voter, JWT_SECRET).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/posts/{}/vote", post_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(r#"{"polarity": "sideways"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(
        store
            .target_score(karma_ledger::models::TargetRef::post(post_id))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn voting_on_missing_comment_is_not_found() {
    let store = MemoryStore::new();
    let voter = Uuid::new_v4();
    store.add_user(voter).await;

    let app = test_app(store);
    let token = Claims::new(voter, JWT_SECRET).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/comments/{}/vote", Uuid::new_v4()))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(r#"{"polarity": "down"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn exp_total_and_history_are_readable_without_auth() {
    let store = MemoryStore::new();
    let author = Uuid::new_v4();
    let voter = Uuid::new_v4();
    store.add_user(voter).await;
    let post_id = store.add_content(TargetKind::Post, author).await;

    let app = test_app(store);
    let token = Claims::new(voter, JWT_SECRET).unwrap();

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/posts/{}/vote", post_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(r#"{"polarity": "up"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/users/{}/exp", author))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["exp"], 5);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/users/{}/exp/history?limit=10", author))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["amount"], 5);
    assert_eq!(entries[0]["reason"], "post upvoted");
}
