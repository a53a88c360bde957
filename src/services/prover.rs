// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the zero-knowledge proof acquisition service.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AuthError;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_KEY_CLAIM_NAME: &str = "sub";

/// Proof acquisition error categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// The prover refused the inputs.
    Rejected(String),
    /// The prover could not be reached or answered with a server error.
    Transient(String),
}

impl From<ProofError> for AuthError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::Rejected(msg) => AuthError::ProofRejected(msg),
            ProofError::Transient(msg) => AuthError::ProofGatewayUnavailable(msg),
        }
    }
}

/// Ephemeral session material supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralMaterial {
    pub extended_ephemeral_public_key: String,
    pub max_epoch: u64,
    pub jwt_randomness: String,
    #[serde(default)]
    pub key_claim_name: Option<String>,
}

/// Body sent to the prover.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub jwt: String,
    pub extended_ephemeral_public_key: String,
    pub max_epoch: u64,
    pub jwt_randomness: String,
    pub salt: String,
    pub key_claim_name: String,
}

impl ProofRequest {
    pub fn new(jwt: &str, salt: &str, material: &EphemeralMaterial) -> Self {
        Self {
            jwt: jwt.to_string(),
            extended_ephemeral_public_key: material.extended_ephemeral_public_key.clone(),
            max_epoch: material.max_epoch,
            jwt_randomness: material.jwt_randomness.clone(),
            salt: salt.to_string(),
            key_claim_name: material
                .key_claim_name
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_CLAIM_NAME.to_string()),
        }
    }
}

/// Opaque attestation returned by the prover.
pub type ProofAttestation = serde_json::Value;

#[async_trait]
pub trait ProofGateway: Send + Sync {
    async fn acquire(&self, request: &ProofRequest) -> Result<ProofAttestation, ProofError>;
}

/// HTTP prover client.
pub struct ProverClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl ProverClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building prover HTTP client")?;

        let endpoint = format!("{}/v1", base_url.trim_end_matches('/'));
        tracing::info!(endpoint = %endpoint, "Initialized proof gateway client");

        Ok(Self {
            http_client,
            endpoint,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProverErrorBody {
    #[serde(alias = "message")]
    error: Option<String>,
}

#[async_trait]
impl ProofGateway for ProverClient {
    async fn acquire(&self, request: &ProofRequest) -> Result<ProofAttestation, ProofError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ProofError::Transient(format!("prover request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ProofError::Transient(format!(
                "prover returned status {status}"
            )));
        }
        if !status.is_success() {
            let reason = response
                .json::<ProverErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("prover returned status {status}"));
            tracing::warn!(status = %status, reason = %reason, "Prover rejected request");
            return Err(ProofError::Rejected(reason));
        }

        response
            .json::<ProofAttestation>()
            .await
            .map_err(|e| ProofError::Transient(format!("invalid prover JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> EphemeralMaterial {
        EphemeralMaterial {
            extended_ephemeral_public_key: "AAEC".to_string(),
            max_epoch: 42,
            jwt_randomness: "123".to_string(),
            key_claim_name: None,
        }
    }

    #[test]
    fn test_request_wire_format() {
        let body = serde_json::to_value(ProofRequest::new("jwt", "salt", &material())).unwrap();
        assert_eq!(body["extendedEphemeralPublicKey"], "AAEC");
        assert_eq!(body["maxEpoch"], 42);
        assert_eq!(body["jwtRandomness"], "123");
        assert_eq!(body["keyClaimName"], "sub");
        assert_eq!(body["salt"], "salt");
    }

    #[test]
    fn test_error_mapping() {
        assert!(AuthError::from(ProofError::Transient("down".into())).is_transient());
        assert_eq!(
            AuthError::from(ProofError::Rejected("bad jwt".into())),
            AuthError::ProofRejected("bad jwt".to_string())
        );
    }

    #[tokio::test]
    async fn test_unreachable_prover_is_transient() {
        let client = ProverClient::new("http://127.0.0.1:1/").unwrap();
        let result = client
            .acquire(&ProofRequest::new("jwt", "salt", &material()))
            .await;
        assert!(matches!(result, Err(ProofError::Transient(_))));
    }
}
