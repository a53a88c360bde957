// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token minting and decoding.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate keys derived
//! from the configured master key. Refresh tokens are stored only as keyed
//! HMAC-SHA256 digests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::Config;
use crate::error::AuthError;
use crate::models::{Account, RefreshTokenEntry};

type HmacSha256 = Hmac<Sha256>;

const CLOCK_SKEW_SECS: u64 = 30;

const ACCESS_KEY_INFO: &[u8] = b"session-access-signing-v1";
const REFRESH_KEY_INFO: &[u8] = b"session-refresh-signing-v1";
const HASH_KEY_INFO: &[u8] = b"session-refresh-hash-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both session token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub account_id: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Unique per refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// A freshly minted refresh token and the entry to store for it.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub entry: RefreshTokenEntry,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct IssuedPair {
    pub access_token: String,
    pub refresh: IssuedRefreshToken,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

pub struct TokenService {
    access_keys: SigningKeys,
    refresh_keys: SigningKeys,
    /// Keyed MAC for stored refresh token digests
    hash_mac: HmacSha256,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

fn derive_key(master: &[u8], info: &[u8]) -> anyhow::Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, master);
    let mut out = [0u8; 32];
    hk.expand(info, &mut out)
        .map_err(|e| anyhow::anyhow!("HKDF expand failed: {:?}", e))?;
    Ok(out)
}

impl TokenService {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let master = &config.jwt_signing_key;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.session_issuer.as_str()]);
        validation.set_audience(&[config.session_audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = CLOCK_SKEW_SECS;

        Ok(Self {
            access_keys: SigningKeys::from_secret(&derive_key(master, ACCESS_KEY_INFO)?),
            refresh_keys: SigningKeys::from_secret(&derive_key(master, REFRESH_KEY_INFO)?),
            hash_mac: HmacSha256::new_from_slice(&derive_key(master, HASH_KEY_INFO)?)
                .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?,
            validation,
            issuer: config.session_issuer.clone(),
            audience: config.session_audience.clone(),
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs),
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access_keys,
            TokenKind::Refresh => &self.refresh_keys,
        }
    }

    /// Claims for a new token of `kind` issued at `now`.
    pub fn claims_for(
        &self,
        account: &Account,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> SessionClaims {
        let (ttl, jti) = match kind {
            TokenKind::Access => (self.access_ttl, None),
            TokenKind::Refresh => (self.refresh_ttl, Some(uuid::Uuid::new_v4().to_string())),
        };
        SessionClaims {
            account_id: account.id.clone(),
            email: account.email.clone(),
            kind,
            jti,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        }
    }

    /// Sign arbitrary session claims with the key for their kind.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(claims.kind).encoding,
        )
        .map_err(|e| AuthError::TokenIssuance(e.to_string()))
    }

    pub fn issue_access(&self, account: &Account) -> Result<String, AuthError> {
        self.sign(&self.claims_for(account, TokenKind::Access, Utc::now()))
    }

    pub fn issue_refresh(&self, account: &Account) -> Result<IssuedRefreshToken, AuthError> {
        let claims = self.claims_for(account, TokenKind::Refresh, Utc::now());
        let token = self.sign(&claims)?;
        let entry = RefreshTokenEntry {
            jti: claims.jti.clone().unwrap_or_default(),
            token_hash: self.hash_refresh_token(&token),
            issued_at: timestamp(claims.iat),
            expires_at: timestamp(claims.exp),
        };
        Ok(IssuedRefreshToken { token, entry })
    }

    pub fn issue_pair(&self, account: &Account) -> Result<IssuedPair, AuthError> {
        Ok(IssuedPair {
            access_token: self.issue_access(account)?,
            refresh: self.issue_refresh(account)?,
        })
    }

    /// Verify signature, issuer, audience, expiry and kind.
    pub fn decode(&self, token: &str, kind: TokenKind) -> Result<SessionClaims, AuthError> {
        let claims =
            decode::<SessionClaims>(token.trim(), &self.keys(kind).decoding, &self.validation)
                .map_err(|e| match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                    _ => AuthError::InvalidToken,
                })?
                .claims;

        if claims.kind != kind {
            return Err(AuthError::InvalidToken);
        }
        if kind == TokenKind::Refresh && claims.jti.as_deref().unwrap_or_default().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Keyed digest stored in place of the raw refresh token.
    pub fn hash_refresh_token(&self, token: &str) -> String {
        let mut mac = self.hash_mac.clone();
        mac.update(token.trim().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}
