// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token verification.

use chrono::Utc;
use std::sync::Arc;

use crate::db::AccountRepository;
use crate::error::AuthError;
use crate::models::Account;
use crate::services::tokens::{SessionClaims, TokenKind, TokenService};

/// A verified access token and the account it belongs to.
#[derive(Debug, Clone)]
pub struct VerifiedAccess {
    pub claims: SessionClaims,
    pub account: Account,
}

impl VerifiedAccess {
    pub fn account_id(&self) -> &str {
        &self.account.id
    }
}

/// A verified refresh token that is still listed on its account.
#[derive(Debug, Clone)]
pub struct VerifiedRefresh {
    pub claims: SessionClaims,
    pub account: Account,
    pub token_hash: String,
}

#[derive(Clone)]
pub struct SessionVerifier {
    repo: Arc<dyn AccountRepository>,
    tokens: Arc<TokenService>,
}

impl SessionVerifier {
    pub fn new(repo: Arc<dyn AccountRepository>, tokens: Arc<TokenService>) -> Self {
        Self { repo, tokens }
    }

    async fn load_active(&self, claims: &SessionClaims) -> Result<Account, AuthError> {
        match self.repo.find_by_id(&claims.account_id).await? {
            Some(account) if account.active => Ok(account),
            _ => Err(AuthError::AccountInactiveOrMissing),
        }
    }

    /// Verify an access token. The token itself is stateless; the account
    /// must still exist and be active.
    pub async fn verify_access(&self, token: &str) -> Result<VerifiedAccess, AuthError> {
        let claims = self.tokens.decode(token, TokenKind::Access)?;
        let account = self.load_active(&claims).await?;
        Ok(VerifiedAccess { claims, account })
    }

    /// Verify a refresh token: cryptographically valid and present in the
    /// account's current token list.
    pub async fn verify_refresh(&self, token: &str) -> Result<VerifiedRefresh, AuthError> {
        let claims = self.tokens.decode(token, TokenKind::Refresh)?;
        let account = self.load_active(&claims).await?;
        let token_hash = self.tokens.hash_refresh_token(token);

        let entry = account
            .find_refresh_token(&token_hash)
            .ok_or(AuthError::RefreshTokenRevoked)?;
        if entry.is_expired(Utc::now()) {
            return Err(AuthError::ExpiredToken);
        }

        Ok(VerifiedRefresh {
            claims,
            account,
            token_hash,
        })
    }
}
