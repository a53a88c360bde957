// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid access tokens
//! 2. Protected routes accept bearer and cookie access tokens
//! 3. The full login / refresh / logout flow works over HTTP
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{authed_request, body_json, create_test_app, json_request, zklogin_body};

/// Log in over HTTP and return the response JSON.
async fn login(app: &axum::Router, sub: &str, email: &str, salt: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/zklogin",
            &zklogin_body(sub, email, salt),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let ctx = create_test_app();

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let ctx = create_test_app();

    let response = ctx
        .app
        .oneshot(authed_request("GET", "/api/me", "invalid.token.here", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_login_then_profile_with_bearer() {
    let ctx = create_test_app();
    let session = login(&ctx.app, "u1", "u1@example.com", "s1").await;
    assert_eq!(session["created"], true);
    assert_eq!(session["account"]["loginCount"], 1);
    assert!(session["account"].get("salt").is_none());
    assert!(session["account"].get("refreshTokens").is_none());

    let token = session["accessToken"].as_str().unwrap();
    let response = ctx
        .app
        .clone()
        .oneshot(authed_request("GET", "/api/me", token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["email"], "u1@example.com");
    assert_eq!(me["walletAddress"], session["walletAddress"]);
}

#[tokio::test]
async fn test_login_sets_access_cookie() {
    let ctx = create_test_app();

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/zklogin",
            &zklogin_body("u1", "u1@example.com", "s1"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("zk_access_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=900"));
    // Local frontend: no Secure flag.
    assert!(!set_cookie.contains("Secure"));

    let cookie = set_cookie.split(';').next().unwrap();
    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/stats")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["loginCount"], 1);
    assert_eq!(stats["activeSessions"], 1);
}

#[tokio::test]
async fn test_refresh_over_http() {
    let ctx = create_test_app();
    let session = login(&ctx.app, "u1", "u1@example.com", "s1").await;
    let refresh_token = session["refreshToken"].as_str().unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/refresh",
            &json!({ "refreshToken": refresh_token }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_eq!(rotated["created"], false);
    assert_ne!(rotated["refreshToken"], session["refreshToken"]);

    // Replay of the consumed token.
    let response = ctx
        .app
        .oneshot(json_request(
            "POST",
            "/auth/refresh",
            &json!({ "refreshToken": refresh_token }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "refresh_token_revoked");
}

#[tokio::test]
async fn test_logout_all_over_http() {
    let ctx = create_test_app();
    let session = login(&ctx.app, "u1", "u1@example.com", "s1").await;
    let access = session["accessToken"].as_str().unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/auth/logout",
            access,
            Some(&json!({ "logoutAll": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cleared.starts_with("zk_access_token="));
    assert!(cleared.contains("Max-Age=0"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["loggedOutAll"], true);

    // Access token outlives logout until it expires.
    let response = ctx
        .app
        .clone()
        .oneshot(authed_request("GET", "/api/me", access, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(json_request(
            "POST",
            "/auth/refresh",
            &json!({ "refreshToken": session["refreshToken"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_body() {
    let ctx = create_test_app();
    let session = login(&ctx.app, "u1", "u1@example.com", "s1").await;
    let access = session["accessToken"].as_str().unwrap();

    let response = ctx
        .app
        .oneshot(authed_request("POST", "/auth/logout", access, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["removed"], false);
    assert_eq!(body["loggedOutAll"], false);
}

#[tokio::test]
async fn test_deleted_account_rejects_access_token() {
    let ctx = create_test_app();
    let session = login(&ctx.app, "u1", "u1@example.com", "s1").await;
    let access = session["accessToken"].as_str().unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(authed_request("DELETE", "/api/account", access, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(authed_request("GET", "/api/me", access, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "account_inactive_or_missing"
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let ctx = create_test_app();

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/me")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let ctx = create_test_app();

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["storage"], "memory");
    assert_eq!(health["proofRequired"], false);
}
