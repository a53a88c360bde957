// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated accounts.

use crate::error::Result;
use crate::middleware::auth::AuthAccount;
use crate::models::account::{PreferencesUpdate, Theme};
use crate::models::wallet::validate_wallet_address;
use crate::models::{AccountStats, ProfileUpdate, PublicAccount, WalletAddress};
use crate::services::address::addresses_equal;
use crate::services::EphemeralMaterial;
use crate::AppState;
use axum::{
    extract::State,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via access token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/stats", get(get_stats))
        .route("/api/verify-wallet", post(verify_wallet))
        .route("/api/zkproof", post(acquire_proof))
        .route("/api/account", delete(delete_account))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get the current account's profile.
async fn get_me(Extension(auth): Extension<AuthAccount>) -> Json<PublicAccount> {
    Json(auth.account.to_public())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: Option<String>,
    #[validate(nested)]
    pub preferences: Option<PreferencesRequest>,
}

/// Display names are stored trimmed, so the bound applies after trimming.
fn validate_display_name(name: &str) -> std::result::Result<(), validator::ValidationError> {
    let len = name.trim().chars().count();
    if (2..=50).contains(&len) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("length")
            .with_message("Name must be 2-50 characters".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub theme: Option<Theme>,
    #[validate(length(min = 2, max = 5, message = "Language must be 2-5 characters"))]
    pub language: Option<String>,
    pub notifications: Option<NotificationsRequest>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationsRequest {
    pub email: Option<bool>,
    pub push: Option<bool>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            name: req.name,
            preferences: req.preferences.map(|p| PreferencesUpdate {
                theme: p.theme,
                language: p.language,
                email_notifications: p.notifications.as_ref().and_then(|n| n.email),
                push_notifications: p.notifications.as_ref().and_then(|n| n.push),
            }),
        }
    }
}

/// Update name and merge preferences.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<PublicAccount>> {
    body.validate()?;

    let account = state
        .repository()
        .update_profile(&auth.account_id, &body.into())
        .await?;

    tracing::info!(account_id = %auth.account_id, "Profile updated");
    Ok(Json(account.to_public()))
}

// ─── Stats ───────────────────────────────────────────────────

async fn get_stats(Extension(auth): Extension<AuthAccount>) -> Json<AccountStats> {
    Json(auth.account.stats(chrono::Utc::now()))
}

// ─── Wallet Verification ─────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyWalletRequest {
    #[validate(custom(function = "validate_wallet_address"))]
    pub wallet_address: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct VerifyWalletResponse {
    pub is_valid: bool,
    pub wallet_address: String,
}

/// Check a presented address against the account's bound address.
async fn verify_wallet(
    Extension(auth): Extension<AuthAccount>,
    Json(body): Json<VerifyWalletRequest>,
) -> Result<Json<VerifyWalletResponse>> {
    body.validate()?;

    let is_valid = WalletAddress::parse(&body.wallet_address)
        .is_some_and(|w| addresses_equal(&w, &auth.account.wallet_address));

    Ok(Json(VerifyWalletResponse {
        is_valid,
        wallet_address: auth.account.wallet_address.to_string(),
    }))
}

// ─── Proof Acquisition ───────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequestBody {
    #[validate(length(min = 1, message = "Identity token is required"))]
    pub jwt: String,
    #[serde(flatten)]
    pub material: EphemeralMaterial,
}

#[derive(Serialize)]
pub struct ProofResponse {
    pub proof: serde_json::Value,
}

/// Forward ephemeral material plus the stored salt to the prover.
async fn acquire_proof(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Json(body): Json<ProofRequestBody>,
) -> Result<Json<ProofResponse>> {
    body.validate()?;

    let proof = state
        .sessions
        .acquire_proof(&auth.account, &body.jwt, &body.material)
        .await?;

    Ok(Json(ProofResponse { proof }))
}

// ─── Account Deactivation ────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// Deactivate the account. Refresh tokens are dropped; the record is kept.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<DeleteAccountResponse>> {
    tracing::info!(
        account_id = %auth.account_id,
        "User-initiated account deactivation"
    );

    state.sessions.deactivate(&auth.account_id).await?;

    Ok(Json(DeleteAccountResponse {
        success: true,
        message: "Account deactivated".to_string(),
    }))
}
