// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! zkLogin session routes: login, refresh, logout and wallet lookup.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthAccount, ACCESS_COOKIE};
use crate::models::wallet::validate_wallet_address;
use crate::models::{LoginContext, PublicAccount};
use crate::services::{EphemeralMaterial, IssueSessionRequest, SessionResult};
use crate::time_utils::cookie_max_age;
use crate::AppState;

/// Public session routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/zklogin", post(zklogin))
        .route("/auth/refresh", post(refresh))
        .route("/auth/wallet-address", post(wallet_address))
}

/// Session routes that need an access token.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout", post(logout))
}

// ─── Request / Response Types ────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ZkLoginRequest {
    #[validate(length(min = 1, message = "Identity token is required"))]
    pub jwt: String,
    #[validate(custom(function = "validate_wallet_address"))]
    pub wallet_address: String,
    #[validate(length(min = 1, max = 128, message = "User salt is required"))]
    pub user_salt: String,
    #[serde(default)]
    pub aud: Option<String>,
    /// Ephemeral session material, needed when proofs are enforced at login
    #[serde(default)]
    pub ephemeral: Option<EphemeralMaterial>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub logout_all: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WalletAddressRequest {
    #[validate(length(min = 1, message = "Identity token is required"))]
    pub jwt: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub message: String,
    pub account: PublicAccount,
    pub access_token: String,
    pub refresh_token: String,
    pub wallet_address: String,
    pub created: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub success: bool,
    pub removed: bool,
    pub logged_out_all: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddressResponse {
    pub wallet_address: String,
}

// ─── Helpers ─────────────────────────────────────────────────

/// Request metadata recorded on the account at login.
fn login_context(headers: &HeaderMap) -> LoginContext {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.chars().take(256).collect());

    // Cloud Run puts the client first in X-Forwarded-For.
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    LoginContext {
        user_agent,
        ip_address,
    }
}

fn is_local(frontend_url: &str) -> bool {
    frontend_url.starts_with("http://localhost") || frontend_url.starts_with("http://127.0.0.1")
}

fn access_cookie(state: &AppState, value: String) -> Cookie<'static> {
    build_access_cookie(
        state,
        value,
        cookie_max_age(state.sessions.tokens().access_ttl()),
    )
}

/// Expired cookie that clears the access token whether or not the request sent one.
fn expired_access_cookie(state: &AppState) -> Cookie<'static> {
    build_access_cookie(state, String::new(), time::Duration::ZERO)
}

fn build_access_cookie(state: &AppState, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((ACCESS_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!is_local(&state.config.frontend_url))
        .max_age(max_age)
        .build()
}

fn session_response(result: SessionResult, message: &str) -> SessionResponse {
    SessionResponse {
        message: message.to_string(),
        wallet_address: result.account.wallet_address.to_string(),
        account: result.account.to_public(),
        access_token: result.access_token,
        refresh_token: result.refresh_token,
        created: result.created,
    }
}

// ─── Handlers ────────────────────────────────────────────────

/// Exchange an identity token and wallet binding for a session.
async fn zklogin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<ZkLoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    body.validate()?;

    let result = state
        .sessions
        .issue(IssueSessionRequest {
            identity_token: body.jwt,
            wallet_address: body.wallet_address,
            salt: body.user_salt,
            audience: body.aud,
            ephemeral: body.ephemeral,
            login: login_context(&headers),
        })
        .await?;

    let message = if result.created {
        "Account created successfully"
    } else {
        "Login successful"
    };
    let jar = jar.add(access_cookie(&state, result.access_token.clone()));

    Ok((jar, Json(session_response(result, message))))
}

/// Rotate a refresh token.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RefreshRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    body.validate()?;

    let result = state.sessions.refresh(&body.refresh_token).await?;
    let jar = jar.add(access_cookie(&state, result.access_token.clone()));

    Ok((
        jar,
        Json(session_response(result, "Token refreshed successfully")),
    ))
}

/// Revoke the presented refresh token, or every refresh token with `logoutAll`.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    jar: CookieJar,
    body: Option<Json<LogoutRequest>>,
) -> Result<(CookieJar, Json<LogoutResponse>)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let ack = state
        .sessions
        .revoke(
            &auth.account_id,
            body.refresh_token.as_deref(),
            body.logout_all,
        )
        .await?;

    Ok((
        jar.add(expired_access_cookie(&state)),
        Json(LogoutResponse {
            success: true,
            removed: ack.removed,
            logged_out_all: ack.revoked_all,
        }),
    ))
}

/// Wallet address bound to an identity token's subject. Never returns the salt.
async fn wallet_address(
    State(state): State<Arc<AppState>>,
    Json(body): Json<WalletAddressRequest>,
) -> Result<Json<WalletAddressResponse>> {
    body.validate()?;

    let wallet = state
        .sessions
        .wallet_for_identity(&body.jwt)
        .await?
        .ok_or_else(|| AppError::NotFound("No account for this identity".to_string()))?;

    Ok(Json(WalletAddressResponse {
        wallet_address: wallet.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_login_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("test-agent/1.0"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        let ctx = login_context(&headers);
        assert_eq!(ctx.user_agent.as_deref(), Some("test-agent/1.0"));
        assert_eq!(ctx.ip_address.as_deref(), Some("203.0.113.7"));

        assert_eq!(login_context(&HeaderMap::new()), LoginContext::default());
    }

    #[test]
    fn test_zklogin_request_validation() {
        let valid = ZkLoginRequest {
            jwt: "a.b.c".to_string(),
            wallet_address: format!("0x{}", "ab".repeat(32)),
            user_salt: "12345".to_string(),
            aud: None,
            ephemeral: None,
        };
        assert!(valid.validate().is_ok());

        let bad_wallet = ZkLoginRequest {
            wallet_address: "0x1234".to_string(),
            ..valid
        };
        assert!(bad_wallet.validate().is_err());
    }
}
