// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept bearer tokens and the session cookie
//! 3. Public routes stay reachable without a token
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use pantryshare::middleware::auth::{create_jwt, SESSION_COOKIE};
use pantryshare::models::UserRole;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

mod common;
use common::{create_test_app, profile, request};

/// Token with arbitrary expiry, for rejection tests.
fn jwt_expiring_at(user_id: &str, exp: usize, signing_key: &[u8]) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        role: &'static str,
        exp: usize,
        iat: usize,
    }

    let claims = Claims {
        sub: user_id.to_string(),
        role: "volunteer",
        exp,
        iat: exp.saturating_sub(3600),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(request("GET", "/api/dashboard/user-stats", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_wrong_key() {
    let app = create_test_app();
    let token = create_jwt("volunteer-1", UserRole::Volunteer, b"a_different_signing_key_entirely").unwrap();

    let response = app
        .router
        .oneshot(request("GET", "/api/dashboard/user-stats", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let app = create_test_app();
    let token = jwt_expiring_at(
        "volunteer-1",
        unix_now() - 24 * 3600,
        &app.state.config.jwt_signing_key,
    );

    let response = app
        .router
        .oneshot(request("GET", "/api/dashboard/user-stats", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/dashboard/user-stats")
                .header(header::AUTHORIZATION, "Token abc.def.ghi")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_bearer_token() {
    let app = create_test_app();
    app.seed_user(profile("volunteer-1", UserRole::Volunteer, 40.0, -74.0))
        .await;
    let token = app.token("volunteer-1", UserRole::Volunteer);

    let response = app
        .router
        .oneshot(request("GET", "/api/dashboard/user-stats", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_with_session_cookie() {
    let app = create_test_app();
    let token = app.token("volunteer-1", UserRole::Volunteer);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/dashboard/user-stats")
                .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_listing_routes_need_no_token() {
    let app = create_test_app();

    for uri in ["/api/listings", "/api/listings/expiring", "/health"] {
        let response = app
            .router
            .clone()
            .oneshot(request("GET", uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn test_write_routes_on_public_paths_still_need_token() {
    let app = create_test_app();

    for (method, uri) in [
        ("POST", "/api/listings"),
        ("PUT", "/api/listings/abc"),
        ("DELETE", "/api/listings/abc"),
        ("POST", "/api/listings/abc/claim"),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(request(method, uri, None, None))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} {}",
            method,
            uri
        );
    }
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/listings")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/listings")
                .header(header::ORIGIN, "https://evil.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
