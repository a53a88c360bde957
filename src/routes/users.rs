// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public account lookups.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/users/wallet/{address}", get(get_by_wallet))
}

/// Minimal public view of the account owning a wallet.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct WalletOwnerResponse {
    pub exists: bool,
    pub name: String,
    pub picture: Option<String>,
    pub verified: bool,
}

async fn get_by_wallet(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<WalletOwnerResponse>> {
    let account = state
        .repository()
        .find_by_wallet(&address)
        .await?
        .ok_or_else(|| AppError::NotFound("No account for this wallet".to_string()))?;

    Ok(Json(WalletOwnerResponse {
        exists: true,
        name: account.name,
        picture: account.picture,
        verified: account.verified,
    }))
}
