//! Shared helpers for the REST integration tests.
//!
//! Every test builds its own router over a fresh in-memory database, drives
//! requests through `tower::ServiceExt::oneshot`, and asserts on the decoded
//! JSON envelope.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use missive_api::auth::{AppState, AppStateInner};
use missive_db::Database;
use serde_json::{Value, json};
use tower::util::ServiceExt;

/// Fresh router and state over an in-memory database.
pub fn test_app() -> (Router, AppState) {
    let db = Database::open_in_memory().expect("open in-memory database");
    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: "integration-test-secret".into(),
    });
    (missive_api::router(state.clone()), state)
}

/// Drive one request through the router and decode the JSON envelope.
pub async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router call");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect response body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).expect("response body is JSON");
    (status, body)
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn bare_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("build request")
}

/// Registers a user and returns their token and the `user` payload.
pub async fn signup(app: &Router, display_name: &str, username: &str) -> (String, Value) {
    let (status, body) = call(
        app,
        json_request(
            Method::POST,
            "/auth/signup",
            None,
            &json!({
                "displayName": display_name,
                "username": username,
                "password": "ink-and-paper",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "signup failed: {body}");
    let token = body["data"]["token"]
        .as_str()
        .expect("signup returns a token")
        .to_string();
    (token, body["data"]["user"].clone())
}

pub struct PairedUsers {
    pub token_a: String,
    pub token_b: String,
    pub user_a: Value,
    pub user_b: Value,
    pub pair_id: String,
}

/// Registers two users and pairs them. The first user confirms the pairing,
/// so the first letter is theirs to send.
pub async fn pair_users(app: &Router) -> PairedUsers {
    let (token_a, user_a) = signup(app, "Ada", "ada").await;
    let (token_b, user_b) = signup(app, "Ben", "ben").await;

    let code = user_b["inviteCode"].as_str().expect("invite code");
    let (status, body) = call(
        app,
        json_request(
            Method::POST,
            "/pair/join",
            Some(&token_a),
            &json!({ "inviteCode": code }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "join failed: {body}");

    let (status, body) = call(
        app,
        json_request(
            Method::POST,
            "/pair/confirm",
            Some(&token_a),
            &json!({ "partnerId": user_b["id"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "confirm failed: {body}");
    let pair_id = body["data"]["pair"]["id"]
        .as_str()
        .expect("pair id")
        .to_string();

    PairedUsers {
        token_a,
        token_b,
        user_a,
        user_b,
        pair_id,
    }
}

/// Rewinds the pair's last send far enough that the delay window has passed.
pub fn expire_timer(state: &AppState, pair_id: &str) {
    state
        .db
        .with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE pairs SET last_sent_at = datetime('now', '-31 days') WHERE id = ?1",
                [pair_id],
            )?;
            anyhow::ensure!(changed == 1, "no pair with id {pair_id}");
            Ok(())
        })
        .expect("backdate last_sent_at");
}
