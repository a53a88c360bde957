// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::RepositoryError;

/// Typed rejection reasons produced by the session lifecycle.
///
/// Every variant except `RepositoryUnavailable` and `ProofGatewayUnavailable`
/// is a final answer for the presented credentials; those two are transient
/// and safe for the caller to retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Identity token is malformed")]
    MalformedToken,

    #[error("Identity token is missing required claim: {0}")]
    MissingClaims(&'static str),

    #[error("Identity token issuer is not trusted: {0}")]
    UntrustedIssuer(String),

    #[error("Derived wallet address does not match the bound address")]
    AddressMismatch,

    #[error("Wallet address does not match the account")]
    WalletAddressMismatch,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Wallet address already registered")]
    WalletTaken,

    #[error("Identity conflicts with an existing account")]
    ConflictingIdentity,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Refresh token has been revoked")]
    RefreshTokenRevoked,

    #[error("Account is inactive or does not exist")]
    AccountInactiveOrMissing,

    #[error("Proof acquisition failed: {0}")]
    ProofRejected(String),

    #[error("Proof gateway unavailable: {0}")]
    ProofGatewayUnavailable(String),

    #[error("Account store unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("Session token could not be issued: {0}")]
    TokenIssuance(String),
}

impl AuthError {
    /// Stable machine-readable code for API clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::MissingClaims(_) => "missing_claims",
            AuthError::UntrustedIssuer(_) => "untrusted_issuer",
            AuthError::AddressMismatch => "address_mismatch",
            AuthError::WalletAddressMismatch => "wallet_address_mismatch",
            AuthError::EmailTaken => "email_taken",
            AuthError::WalletTaken => "wallet_taken",
            AuthError::ConflictingIdentity => "conflicting_identity",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::RefreshTokenRevoked => "refresh_token_revoked",
            AuthError::AccountInactiveOrMissing => "account_inactive_or_missing",
            AuthError::ProofRejected(_) => "proof_rejected",
            AuthError::ProofGatewayUnavailable(_) => "proof_gateway_unavailable",
            AuthError::RepositoryUnavailable(_) => "repository_unavailable",
            AuthError::TokenIssuance(_) => "token_issuance_failed",
        }
    }

    /// HTTP status code for this rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MalformedToken
            | AuthError::MissingClaims(_)
            | AuthError::UntrustedIssuer(_) => StatusCode::BAD_REQUEST,
            AuthError::AddressMismatch
            | AuthError::WalletAddressMismatch
            | AuthError::AccountInactiveOrMissing => StatusCode::FORBIDDEN,
            AuthError::EmailTaken | AuthError::WalletTaken | AuthError::ConflictingIdentity => {
                StatusCode::CONFLICT
            }
            AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::RefreshTokenRevoked
            | AuthError::ProofRejected(_) => StatusCode::UNAUTHORIZED,
            AuthError::ProofGatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            AuthError::RepositoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::TokenIssuance(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthError::RepositoryUnavailable(_) | AuthError::ProofGatewayUnavailable(_)
        )
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Unavailable(msg) => AuthError::RepositoryUnavailable(msg),
            RepositoryError::NotFound(_) => AuthError::AccountInactiveOrMissing,
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            RepositoryError::Unavailable(msg) => AppError::Database(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Auth(err) => {
                let details = match err {
                    AuthError::TokenIssuance(_) => {
                        tracing::error!(error = %err, "Token issuance failed");
                        None
                    }
                    _ if err.is_transient() => {
                        tracing::error!(error = %err, "Transient session failure");
                        Some(err.to_string())
                    }
                    _ => Some(err.to_string()),
                };
                (err.status_code(), err.error_code(), details)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::SERVICE_UNAVAILABLE, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
