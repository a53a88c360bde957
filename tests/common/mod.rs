// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zklogin_sessions::config::Config;
use zklogin_sessions::db::{AccountRepository, FirestoreDb, MemoryAccountStore};
use zklogin_sessions::models::WalletAddress;
use zklogin_sessions::routes::create_router;
use zklogin_sessions::services::prover::{ProofAttestation, ProofRequest};
use zklogin_sessions::services::{
    AddressDerivation, IssueSessionRequest, LocalAddressDerivation, ProofError, ProofGateway,
    SessionService,
};
use zklogin_sessions::AppState;

pub const ISSUER: &str = "https://accounts.google.com";
pub const CLIENT_ID: &str = "test-client.apps.googleusercontent.com";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Address derivation that counts how often it is consulted.
#[derive(Debug)]
pub struct CountingDerivation {
    inner: LocalAddressDerivation,
    calls: AtomicUsize,
}

impl CountingDerivation {
    pub fn new() -> Self {
        Self {
            inner: LocalAddressDerivation::new(ISSUER),
            calls: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AddressDerivation for CountingDerivation {
    fn derive(&self, subject_id: &str, salt: &str) -> WalletAddress {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.derive(subject_id, salt)
    }
}

/// Prover stub with a scripted answer that records every request.
pub struct StubProver {
    answer: Result<ProofAttestation, ProofError>,
    requests: Mutex<Vec<ProofRequest>>,
}

impl StubProver {
    pub fn accepting() -> Self {
        Self::with_answer(Ok(json!({ "proofPoints": { "a": ["1"] } })))
    }

    #[allow(dead_code)]
    pub fn with_answer(answer: Result<ProofAttestation, ProofError>) -> Self {
        Self {
            answer,
            requests: Mutex::new(Vec::new()),
        }
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<ProofRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProofGateway for StubProver {
    async fn acquire(&self, request: &ProofRequest) -> Result<ProofAttestation, ProofError> {
        self.requests.lock().unwrap().push(request.clone());
        self.answer.clone()
    }
}

/// Everything a test needs to drive the service directly or over HTTP.
#[allow(dead_code)]
pub struct TestContext {
    pub app: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryAccountStore>,
    pub derivation: Arc<CountingDerivation>,
    pub prover: Arc<StubProver>,
}

#[allow(dead_code)]
impl TestContext {
    pub fn sessions(&self) -> &SessionService {
        &self.state.sessions
    }
}

/// Create a test app on the in-memory store with the default config.
#[allow(dead_code)]
pub fn create_test_app() -> TestContext {
    create_test_app_with(Config::test_default(), StubProver::accepting())
}

/// Create a test app with a custom config and prover.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config, prover: StubProver) -> TestContext {
    let store = Arc::new(MemoryAccountStore::new());
    let repo: Arc<dyn AccountRepository> = store.clone();
    create_test_app_on(config, repo, store, prover)
}

/// Create a test app whose service talks to `repo`; `store` stays inspectable.
#[allow(dead_code)]
pub fn create_test_app_on(
    config: Config,
    repo: Arc<dyn AccountRepository>,
    store: Arc<MemoryAccountStore>,
    prover: StubProver,
) -> TestContext {
    let derivation = Arc::new(CountingDerivation::new());
    let prover = Arc::new(prover);
    let sessions = SessionService::new(&config, repo, derivation.clone(), prover.clone())
        .expect("session service");

    let state = Arc::new(AppState { config, sessions });

    TestContext {
        app: create_router(state.clone()),
        state,
        store,
        derivation,
        prover,
    }
}

/// Unsigned-signature identity token with the given claims.
#[allow(dead_code)]
pub fn identity_token_with(claims: serde_json::Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"identity-provider-key"),
    )
    .unwrap()
}

/// Identity token from the trusted issuer for `sub` / `email`.
#[allow(dead_code)]
pub fn identity_token(sub: &str, email: &str) -> String {
    identity_token_with(json!({
        "sub": sub,
        "email": email,
        "iss": ISSUER,
        "aud": CLIENT_ID,
        "name": "Test User",
        "exp": 4_000_000_000u64,
    }))
}

/// Wallet address the service will derive for `sub` / `salt`.
#[allow(dead_code)]
pub fn wallet_for(sub: &str, salt: &str) -> WalletAddress {
    LocalAddressDerivation::new(ISSUER).derive(sub, salt)
}

/// Well-formed issuance request whose wallet matches the derivation.
#[allow(dead_code)]
pub fn login_request(sub: &str, email: &str, salt: &str) -> IssueSessionRequest {
    IssueSessionRequest {
        identity_token: identity_token(sub, email),
        wallet_address: wallet_for(sub, salt).to_string(),
        salt: salt.to_string(),
        audience: None,
        ephemeral: None,
        login: Default::default(),
    }
}

/// JSON body for `POST /auth/zklogin`.
#[allow(dead_code)]
pub fn zklogin_body(sub: &str, email: &str, salt: &str) -> serde_json::Value {
    json!({
        "jwt": identity_token(sub, email),
        "walletAddress": wallet_for(sub, salt).to_string(),
        "userSalt": salt,
    })
}

/// JSON POST request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Request carrying a bearer access token.
#[allow(dead_code)]
pub fn authed_request(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<&serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
