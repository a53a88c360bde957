// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use zklogin_sessions::db::RepositoryError;
use zklogin_sessions::error::{AppError, AuthError};
use zklogin_sessions::services::ProofError;

#[test]
fn test_transient_errors_are_distinct_from_rejections() {
    let transient = [
        AuthError::from(RepositoryError::Unavailable("deadline exceeded".to_string())),
        AuthError::from(ProofError::Transient("connect refused".to_string())),
    ];
    for err in transient {
        assert!(err.is_transient(), "{err:?} should be retryable");
    }

    let final_answers = [
        AuthError::MalformedToken,
        AuthError::AddressMismatch,
        AuthError::WalletAddressMismatch,
        AuthError::EmailTaken,
        AuthError::RefreshTokenRevoked,
        AuthError::AccountInactiveOrMissing,
        AuthError::from(ProofError::Rejected("bad randomness".to_string())),
    ];
    for err in final_answers {
        assert!(!err.is_transient(), "{err:?} should not be retryable");
    }
}

#[test]
fn test_missing_account_maps_to_inactive() {
    let err = AuthError::from(RepositoryError::NotFound("account 42".to_string()));
    assert_eq!(err, AuthError::AccountInactiveOrMissing);
}

#[test]
fn test_status_codes() {
    assert_eq!(AuthError::MalformedToken.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        AuthError::MissingClaims("sub").status_code(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(AuthError::AddressMismatch.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AuthError::WalletTaken.status_code(), StatusCode::CONFLICT);
    assert_eq!(
        AuthError::ConflictingIdentity.status_code(),
        StatusCode::CONFLICT
    );
    assert_eq!(AuthError::ExpiredToken.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        AuthError::ProofGatewayUnavailable("x".to_string()).status_code(),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        AuthError::RepositoryUnavailable("x".to_string()).status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_internal_details_are_hidden() {
    let response =
        AppError::from(AuthError::TokenIssuance("key material".to_string())).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "token_issuance_failed");
    assert!(body.get("details").is_none());
}
