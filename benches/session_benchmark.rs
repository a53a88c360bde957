use criterion::{criterion_group, criterion_main, Criterion};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;
use zklogin_sessions::config::Config;
use zklogin_sessions::db::MemoryAccountStore;
use zklogin_sessions::models::LoginContext;
use zklogin_sessions::services::{
    AddressDerivation, ClaimExtractor, IssueSessionRequest, LocalAddressDerivation,
    ProverClient, SessionService, TokenKind,
};

const ISSUER: &str = "https://accounts.google.com";

fn identity_token(sub: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "sub": sub,
            "email": format!("{sub}@example.com"),
            "iss": ISSUER,
            "aud": "bench-client",
        }),
        &EncodingKey::from_secret(b"identity-provider-key"),
    )
    .expect("Failed to encode identity token")
}

fn benchmark_primitives(c: &mut Criterion) {
    let extractor = ClaimExtractor::new(ISSUER);
    let derivation = LocalAddressDerivation::new(ISSUER);
    let token = identity_token("bench-user");

    let mut group = c.benchmark_group("primitives");

    group.bench_function("extract_claims", |b| {
        b.iter(|| extractor.extract(black_box(&token)))
    });

    group.bench_function("derive_address", |b| {
        b.iter(|| derivation.derive(black_box("bench-user"), black_box("123456789")))
    });

    group.finish();
}

fn benchmark_session_lifecycle(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let config = Config::test_default();
    let sessions = SessionService::new(
        &config,
        Arc::new(MemoryAccountStore::new()),
        Arc::new(LocalAddressDerivation::new(ISSUER)),
        Arc::new(ProverClient::new(&config.prover_url).expect("Failed to build prover client")),
    )
    .expect("Failed to build session service");

    let salt = "123456789";
    let request = IssueSessionRequest {
        identity_token: identity_token("bench-user"),
        wallet_address: LocalAddressDerivation::new(ISSUER)
            .derive("bench-user", salt)
            .to_string(),
        salt: salt.to_string(),
        audience: None,
        ephemeral: None,
        login: LoginContext::default(),
    };

    let session = runtime
        .block_on(sessions.issue(request.clone()))
        .expect("Failed to issue session");

    let mut group = c.benchmark_group("session_lifecycle");

    group.bench_function("issue_existing_account", |b| {
        b.iter(|| runtime.block_on(sessions.issue(black_box(request.clone()))))
    });

    group.bench_function("verify_access", |b| {
        b.iter(|| {
            runtime.block_on(
                sessions
                    .verifier()
                    .verify_access(black_box(&session.access_token)),
            )
        })
    });

    group.bench_function("decode_refresh", |b| {
        b.iter(|| {
            sessions
                .tokens()
                .decode(black_box(&session.refresh_token), TokenKind::Refresh)
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_primitives, benchmark_session_lifecycle);
criterion_main!(benches);
