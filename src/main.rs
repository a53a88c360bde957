// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! zkLogin Sessions API Server
//!
//! Binds identity provider accounts to wallet addresses and issues
//! rotating access/refresh sessions.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zklogin_sessions::{
    config::{Config, StorageBackend},
    db::{AccountRepository, FirestoreDb, MemoryAccountStore},
    services::{LocalAddressDerivation, ProverClient, SessionService},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting zkLogin Sessions API");

    let repo: Arc<dyn AccountRepository> = match config.storage_backend {
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            tracing::info!(project = %config.gcp_project_id, "Firestore account store ready");
            Arc::new(db)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory account store; data is lost on restart");
            Arc::new(MemoryAccountStore::new())
        }
    };

    let derivation = Arc::new(LocalAddressDerivation::new(config.trusted_issuer.clone()));
    let prover = Arc::new(ProverClient::new(&config.prover_url)?);
    tracing::info!(
        prover_url = %config.prover_url,
        require_proof = config.require_proof_on_login,
        "Prover client initialized"
    );

    let sessions = SessionService::new(&config, repo, derivation, prover)?;

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        sessions,
    });

    // Build router
    let app = zklogin_sessions::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zklogin_sessions=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
