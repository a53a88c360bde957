// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::WalletAddress;
use crate::time_utils::format_utc_rfc3339;

/// Account stored in the account store, one per bound identity.
///
/// Stored at: `accounts/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    // ─── Identity (immutable) ────────────────────────────────────
    /// Opaque identifier assigned at creation (also used as document ID)
    pub id: String,
    /// Identity provider subject (`sub` claim)
    pub subject_id: String,
    /// Lowercase-normalized email
    pub email: String,
    /// Address derived from (subject_id, salt)
    pub wallet_address: WalletAddress,
    /// Secret input to address derivation, never returned by the API
    pub salt: String,
    /// Identity provider issuer at creation
    pub issuer: String,
    /// Identity token audience at creation
    pub audience: String,

    // ─── Profile ─────────────────────────────────────────────────
    pub name: String,
    pub picture: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,

    // ─── Status ──────────────────────────────────────────────────
    /// False when soft-deleted; inactive accounts cannot authenticate
    pub active: bool,
    pub verified: bool,

    // ─── Login Tracking ──────────────────────────────────────────
    pub login_count: u64,
    pub last_login_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: LoginMetadata,

    // ─── Sessions ────────────────────────────────────────────────
    /// Current refresh tokens, oldest first
    #[serde(default)]
    pub refresh_tokens: Vec<RefreshTokenEntry>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A refresh token the account currently accepts.
///
/// Only a keyed hash of the token is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenEntry {
    pub jti: String,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Request metadata recorded on each session issuance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Last-seen login metadata stored on the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginMetadata {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub registration_source: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
    pub notifications: NotificationPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            language: "en".to_string(),
            notifications: NotificationPreferences::default(),
        }
    }
}

/// Partial preferences; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

/// Profile fields a user may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub preferences: Option<PreferencesUpdate>,
}

/// Everything needed to create an account on first login.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub subject_id: String,
    pub email: String,
    pub wallet_address: WalletAddress,
    pub salt: String,
    pub issuer: String,
    pub audience: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub login: LoginContext,
}

/// Lowercase and trim an email for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Account {
    /// Materialize a new account. The first login is counted here.
    pub fn from_new(id: String, new: NewAccount, now: DateTime<Utc>) -> Self {
        let email = normalize_email(&new.email);
        let name = new
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Self {
            id,
            subject_id: new.subject_id,
            email,
            wallet_address: new.wallet_address,
            salt: new.salt,
            issuer: new.issuer,
            audience: new.audience,
            name,
            picture: new.picture,
            preferences: Preferences::default(),
            active: true,
            verified: true,
            login_count: 1,
            last_login_at: now,
            metadata: LoginMetadata {
                user_agent: new.login.user_agent,
                ip_address: new.login.ip_address,
                registration_source: "zklogin".to_string(),
            },
            refresh_tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    // ─── Mutations shared by every backend ───────────────────────

    pub fn record_login(&mut self, login: &LoginContext, now: DateTime<Utc>) {
        self.login_count += 1;
        self.last_login_at = now;
        self.metadata.user_agent = login.user_agent.clone();
        self.metadata.ip_address = login.ip_address.clone();
        self.updated_at = now;
    }

    /// Append a refresh token, dropping expired entries and keeping the newest `max`.
    pub fn push_refresh_token(&mut self, entry: RefreshTokenEntry, max: usize, now: DateTime<Utc>) {
        self.refresh_tokens.retain(|t| !t.is_expired(now));
        self.refresh_tokens.push(entry);
        if self.refresh_tokens.len() > max {
            let excess = self.refresh_tokens.len() - max;
            self.refresh_tokens.drain(..excess);
        }
        self.updated_at = now;
    }

    /// Remove the entry with this hash. Returns whether it was present.
    pub fn remove_refresh_token(&mut self, token_hash: &str, now: DateTime<Utc>) -> bool {
        let before = self.refresh_tokens.len();
        self.refresh_tokens.retain(|t| t.token_hash != token_hash);
        let removed = self.refresh_tokens.len() != before;
        if removed {
            self.updated_at = now;
        }
        removed
    }

    pub fn clear_refresh_tokens(&mut self, now: DateTime<Utc>) {
        self.refresh_tokens.clear();
        self.updated_at = now;
    }

    pub fn find_refresh_token(&self, token_hash: &str) -> Option<&RefreshTokenEntry> {
        self.refresh_tokens.iter().find(|t| t.token_hash == token_hash)
    }

    pub fn active_refresh_token_count(&self, now: DateTime<Utc>) -> usize {
        self.refresh_tokens
            .iter()
            .filter(|t| !t.is_expired(now))
            .count()
    }

    pub fn apply_profile_update(&mut self, update: &ProfileUpdate, now: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.trim().to_string();
        }
        if let Some(prefs) = &update.preferences {
            if let Some(theme) = prefs.theme {
                self.preferences.theme = theme;
            }
            if let Some(language) = &prefs.language {
                self.preferences.language = language.clone();
            }
            if let Some(email) = prefs.email_notifications {
                self.preferences.notifications.email = email;
            }
            if let Some(push) = prefs.push_notifications {
                self.preferences.notifications.push = push;
            }
        }
        self.updated_at = now;
    }

    pub fn to_public(&self) -> PublicAccount {
        PublicAccount {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            picture: self.picture.clone(),
            wallet_address: self.wallet_address.to_string(),
            verified: self.verified,
            login_count: self.login_count,
            last_login_at: format_utc_rfc3339(self.last_login_at),
            preferences: self.preferences.clone(),
            created_at: format_utc_rfc3339(self.created_at),
        }
    }

    pub fn stats(&self, now: DateTime<Utc>) -> AccountStats {
        AccountStats {
            login_count: self.login_count,
            last_login_at: format_utc_rfc3339(self.last_login_at),
            created_at: format_utc_rfc3339(self.created_at),
            verified: self.verified,
            active_sessions: self.active_refresh_token_count(now),
        }
    }
}

/// Account as returned to its owner. No salt, refresh tokens or login metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub wallet_address: String,
    pub verified: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub login_count: u64,
    pub last_login_at: String,
    pub preferences: Preferences,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub login_count: u64,
    pub last_login_at: String,
    pub created_at: String,
    pub verified: bool,
    pub active_sessions: usize,
}
