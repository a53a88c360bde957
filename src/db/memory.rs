// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process account store for local development and tests.
//!
//! Per-account mutations run under the map's entry lock, so each one is
//! atomic with respect to other mutations of the same account. Creation takes
//! a store-wide mutex so uniqueness checks and inserts cannot interleave.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex as TokioMutex;

use crate::db::{
    unique_key, unique_keys, AccountRepository, CreateOutcome, RepoResult, RepositoryError,
    UniqueField,
};
use crate::models::{
    Account, LoginContext, NewAccount, ProfileUpdate, RefreshTokenEntry,
    WalletAddress,
};

#[derive(Default)]
pub struct MemoryAccountStore {
    /// account id -> account
    accounts: DashMap<String, Account>,
    /// uniqueness key -> account id
    keys: DashMap<String, String>,
    create_lock: TokioMutex<()>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts, active or not.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn lookup_key(&self, field: UniqueField, value: &str) -> Option<Account> {
        let id = self.keys.get(&unique_key(field, value))?.value().clone();
        self.accounts.get(&id).map(|a| a.value().clone())
    }

    /// Apply `f` to the account under its entry lock.
    fn mutate<T>(&self, id: &str, f: impl FnOnce(&mut Account) -> T) -> RepoResult<T> {
        let mut entry = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("account {id}")))?;
        Ok(f(entry.value_mut()))
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountStore {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Account>> {
        Ok(self.accounts.get(id).map(|a| a.value().clone()))
    }

    async fn find_by_subject(&self, subject_id: &str) -> RepoResult<Option<Account>> {
        Ok(self
            .lookup_key(UniqueField::Subject, subject_id)
            .filter(|a| a.active))
    }

    async fn find_by_wallet(&self, wallet_address: &str) -> RepoResult<Option<Account>> {
        let Some(wallet) = WalletAddress::parse(wallet_address) else {
            return Ok(None);
        };
        Ok(self
            .lookup_key(UniqueField::Wallet, wallet.as_str())
            .filter(|a| a.active))
    }

    async fn create_if_absent(&self, candidate: NewAccount) -> RepoResult<CreateOutcome> {
        let _guard = self.create_lock.lock().await;

        if let Some(existing) = self.lookup_key(UniqueField::Subject, &candidate.subject_id) {
            return Ok(CreateOutcome::Existing(existing));
        }

        let account = Account::from_new(uuid::Uuid::new_v4().to_string(), candidate, Utc::now());
        let keys = unique_keys(&account);

        if let Some((field, _)) = keys.iter().find(|(_, key)| self.keys.contains_key(key)) {
            return Ok(CreateOutcome::Conflict(*field));
        }

        for (_, key) in keys {
            self.keys.insert(key, account.id.clone());
        }
        self.accounts.insert(account.id.clone(), account.clone());

        tracing::debug!(account_id = %account.id, "Account stored");
        Ok(CreateOutcome::Created(account))
    }

    async fn record_login(&self, id: &str, login: &LoginContext) -> RepoResult<Account> {
        self.mutate(id, |account| {
            account.record_login(login, Utc::now());
            account.clone()
        })
    }

    async fn push_refresh_token(
        &self,
        id: &str,
        entry: RefreshTokenEntry,
        max: usize,
    ) -> RepoResult<()> {
        self.mutate(id, |account| {
            account.push_refresh_token(entry, max, Utc::now())
        })
    }

    async fn remove_refresh_token(&self, id: &str, token_hash: &str) -> RepoResult<bool> {
        match self.mutate(id, |account| {
            account.remove_refresh_token(token_hash, Utc::now())
        }) {
            Err(RepositoryError::NotFound(_)) => Ok(false),
            other => other,
        }
    }

    async fn rotate_refresh_token(
        &self,
        id: &str,
        old_hash: &str,
        new_entry: RefreshTokenEntry,
        max: usize,
    ) -> RepoResult<bool> {
        self.mutate(id, |account| {
            let now = Utc::now();
            if !account.remove_refresh_token(old_hash, now) {
                return false;
            }
            account.push_refresh_token(new_entry, max, now);
            true
        })
    }

    async fn clear_refresh_tokens(&self, id: &str) -> RepoResult<bool> {
        let cleared = self.mutate(id, |account| {
            if account.refresh_tokens.is_empty() {
                return false;
            }
            account.clear_refresh_tokens(Utc::now());
            true
        });
        match cleared {
            Err(RepositoryError::NotFound(_)) => Ok(false),
            other => other,
        }
    }

    async fn deactivate(&self, id: &str) -> RepoResult<()> {
        self.mutate(id, |account| {
            let now = Utc::now();
            account.active = false;
            account.clear_refresh_tokens(now);
        })
    }

    async fn reactivate(&self, id: &str) -> RepoResult<()> {
        self.mutate(id, |account| {
            account.active = true;
            account.updated_at = Utc::now();
        })
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> RepoResult<Account> {
        self.mutate(id, |account| {
            account.apply_profile_update(update, Utc::now());
            account.clone()
        })
    }
}
