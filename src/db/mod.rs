// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account storage.
//!
//! The session lifecycle talks to storage only through [`AccountRepository`].
//! Two backends implement it: Firestore for deployments and an in-process
//! store for local development and tests.

pub mod firestore;
pub mod memory;

use async_trait::async_trait;

use crate::models::{Account, LoginContext, NewAccount, ProfileUpdate, RefreshTokenEntry};

pub use firestore::FirestoreDb;
pub use memory::MemoryAccountStore;

/// Collection names as constants.
pub mod collections {
    pub const ACCOUNTS: &str = "accounts";
    /// Uniqueness keys: `{field}:{value}` -> owning account id
    pub const ACCOUNT_KEYS: &str = "account_keys";
}

/// Storage-layer failures.
///
/// `Unavailable` is transient and never a statement about the credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Account fields that must be globally unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Subject,
    Email,
    Wallet,
    Salt,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Subject => "subject",
            UniqueField::Email => "email",
            UniqueField::Wallet => "wallet",
            UniqueField::Salt => "salt",
        }
    }
}

/// Result of [`AccountRepository::create_if_absent`].
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The candidate was stored.
    Created(Account),
    /// An account with the candidate's subject already exists (active or not).
    Existing(Account),
    /// Another account already holds this unique value; nothing was written.
    Conflict(UniqueField),
}

/// Uniqueness key for a field value. Salts are keyed by digest so the raw
/// salt never appears in a document id.
pub fn unique_key(field: UniqueField, value: &str) -> String {
    use sha2::{Digest, Sha256};

    match field {
        UniqueField::Salt => format!("salt:{}", hex::encode(Sha256::digest(value.as_bytes()))),
        _ => format!("{}:{}", field.as_str(), urlencoding::encode(value)),
    }
}

/// Uniqueness keys for a candidate, in the order conflicts are reported.
pub fn unique_keys(account: &Account) -> [(UniqueField, String); 4] {
    [
        (
            UniqueField::Subject,
            unique_key(UniqueField::Subject, &account.subject_id),
        ),
        (
            UniqueField::Email,
            unique_key(UniqueField::Email, &account.email),
        ),
        (
            UniqueField::Wallet,
            unique_key(UniqueField::Wallet, account.wallet_address.as_str()),
        ),
        (UniqueField::Salt, unique_key(UniqueField::Salt, &account.salt)),
    ]
}

/// Persistent account and refresh-token state.
///
/// Every mutating operation is a single atomic storage operation on one
/// account: concurrent callers never observe or produce a torn token list.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Load an account by id, active or not.
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Account>>;

    /// Active account for an identity provider subject.
    async fn find_by_subject(&self, subject_id: &str) -> RepoResult<Option<Account>>;

    /// Active account owning a wallet address.
    async fn find_by_wallet(&self, wallet_address: &str) -> RepoResult<Option<Account>>;

    /// Store a new account unless its subject, email, wallet or salt is taken.
    ///
    /// Of two concurrent creations for one subject exactly one returns
    /// `Created`; the other returns `Existing` with the winner.
    async fn create_if_absent(&self, candidate: NewAccount) -> RepoResult<CreateOutcome>;

    /// Bump login counters and record request metadata.
    async fn record_login(&self, id: &str, login: &LoginContext) -> RepoResult<Account>;

    /// Append a refresh token, evicting the oldest beyond `max`.
    async fn push_refresh_token(
        &self,
        id: &str,
        entry: RefreshTokenEntry,
        max: usize,
    ) -> RepoResult<()>;

    /// Remove a refresh token by hash. Idempotent; returns whether it was present.
    async fn remove_refresh_token(&self, id: &str, token_hash: &str) -> RepoResult<bool>;

    /// Replace `old_hash` with `new_entry` in one mutation.
    ///
    /// Returns `false` and writes nothing when `old_hash` is no longer listed.
    async fn rotate_refresh_token(
        &self,
        id: &str,
        old_hash: &str,
        new_entry: RefreshTokenEntry,
        max: usize,
    ) -> RepoResult<bool>;

    /// Drop every refresh token. Idempotent.
    ///
    /// Returns `true` when at least one token was listed.
    async fn clear_refresh_tokens(&self, id: &str) -> RepoResult<bool>;

    /// Soft-delete the account and drop its refresh tokens.
    async fn deactivate(&self, id: &str) -> RepoResult<()>;

    async fn reactivate(&self, id: &str) -> RepoResult<()>;

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> RepoResult<Account>;
}
