// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! zkLogin sessions: turn an identity provider token plus a derived wallet
//! address into revocable application sessions.
//!
//! This crate provides the backend API that binds identities to wallet
//! addresses, stores accounts and issues rotating access/refresh tokens.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::AccountRepository;
use services::SessionService;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionService,
}

impl AppState {
    pub fn repository(&self) -> &Arc<dyn AccountRepository> {
        self.sessions.repository()
    }
}
