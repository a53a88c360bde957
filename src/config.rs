// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

/// Minimum length of the session signing key.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Longest accepted lifetime for either session token (one year).
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Which account store backs the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Account store backend
    pub storage_backend: StorageBackend,
    /// The single identity provider issuer accepted by the claim extractor
    pub trusted_issuer: String,
    /// `iss` claim of issued session tokens
    pub session_issuer: String,
    /// `aud` claim of issued session tokens
    pub session_audience: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// Bound on the per-account refresh token list
    pub max_refresh_tokens: usize,
    /// Base URL of the zero-knowledge prover
    pub prover_url: String,
    /// Require a successful proof before a session is issued
    pub require_proof_on_login: bool,

    // --- Secrets ---
    /// Master key for session token signing and refresh token hashing (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            trusted_issuer: "https://accounts.google.com".to_string(),
            session_issuer: "zklogin-backend".to_string(),
            session_audience: "zklogin-frontend".to_string(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            max_refresh_tokens: 5,
            prover_url: "http://localhost:8001".to_string(),
            require_proof_on_login: false,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
        }
    }
}

impl Config {
    /// Config used by unit and integration tests.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if jwt_signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::Invalid("JWT_SIGNING_KEY"));
        }

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StorageBackend::Firestore,
        };

        let config = Self {
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage_backend,
            trusted_issuer: env::var("TRUSTED_ISSUER").unwrap_or(defaults.trusted_issuer),
            session_issuer: env::var("SESSION_ISSUER").unwrap_or(defaults.session_issuer),
            session_audience: env::var("SESSION_AUDIENCE").unwrap_or(defaults.session_audience),
            access_token_ttl_secs: parse_var(
                "ACCESS_TOKEN_TTL_SECS",
                defaults.access_token_ttl_secs,
            )?,
            refresh_token_ttl_secs: parse_var(
                "REFRESH_TOKEN_TTL_SECS",
                defaults.refresh_token_ttl_secs,
            )?,
            max_refresh_tokens: parse_var("MAX_REFRESH_TOKENS", defaults.max_refresh_tokens)?,
            prover_url: env::var("PROVER_URL").unwrap_or(defaults.prover_url),
            require_proof_on_login: parse_var(
                "REQUIRE_PROOF_ON_LOGIN",
                defaults.require_proof_on_login,
            )?,
            jwt_signing_key,
        };

        if !(1..=MAX_TOKEN_TTL_SECS).contains(&config.access_token_ttl_secs) {
            return Err(ConfigError::Invalid("ACCESS_TOKEN_TTL_SECS"));
        }
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&config.refresh_token_ttl_secs) {
            return Err(ConfigError::Invalid("REFRESH_TOKEN_TTL_SECS"));
        }
        if config.max_refresh_tokens == 0 {
            return Err(ConfigError::Invalid("MAX_REFRESH_TOKENS"));
        }

        Ok(config)
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
