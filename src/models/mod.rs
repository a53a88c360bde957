// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod account;
pub mod wallet;

pub use account::{
    normalize_email, Account, AccountStats, LoginContext, NewAccount, Preferences,
    PreferencesUpdate, ProfileUpdate, PublicAccount, RefreshTokenEntry, Theme,
};
pub use wallet::WalletAddress;
