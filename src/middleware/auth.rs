// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token authentication middleware.

use crate::error::AppError;
use crate::models::Account;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie carrying the access token for browser clients.
pub const ACCESS_COOKIE: &str = "zk_access_token";

/// Authenticated account extracted from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    pub account_id: String,
    pub account: Account,
}

/// Pull the access token from the cookie, then the `Authorization` header.
fn access_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Middleware that requires a valid access token for an active account.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token(&jar, &request).ok_or(AppError::Unauthorized)?;

    let verified = state.sessions.verifier().verify_access(&token).await?;

    request.extensions_mut().insert(AuthAccount {
        account_id: verified.account.id.clone(),
        account: verified.account,
    });

    Ok(next.run(request).await)
}
