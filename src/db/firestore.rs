// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the account repository.
//!
//! Layout:
//! - `accounts/{id}` holds the account, including its refresh token list
//! - `account_keys/{field}:{value}` maps each unique value to its account id
//!
//! Every mutation runs inside `run_transaction`. Reads inside the transaction
//! register the documents for conflict detection, so Firestore retries the
//! whole closure when a concurrent writer touches the same account or key.

use async_trait::async_trait;
use chrono::Utc;
use firestore::errors::{BackoffError, FirestoreError};
use firestore::FirestoreTransaction;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

use crate::db::{
    collections, unique_key, unique_keys, AccountRepository, CreateOutcome, RepoResult,
    RepositoryError, UniqueField,
};
use crate::models::{
    Account, LoginContext, NewAccount, ProfileUpdate, RefreshTokenEntry, WalletAddress,
};

type TxResult<T> = Result<T, BackoffError<FirestoreError>>;

/// Document in `account_keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountKey {
    account_id: String,
}

/// What a read-modify-write step decided.
enum Mutation<T> {
    Write(T),
    Skip(T),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

fn unavailable(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(e.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> RepoResult<Self> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| unavailable(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> RepoResult<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| unavailable(format!("Failed to connect to Firestore Emulator: {}", e)))?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return `Unavailable` if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> RepoResult<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| unavailable("Database not connected (offline mode)"))
    }

    // ─── Reads ───────────────────────────────────────────────────

    async fn get_account(&self, id: &str) -> RepoResult<Option<Account>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNTS)
            .obj()
            .one(id)
            .await
            .map_err(unavailable)
    }

    /// Resolve a uniqueness key to its account, if any.
    async fn account_for_key(&self, key: &str) -> RepoResult<Option<Account>> {
        let owner: Option<AccountKey> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNT_KEYS)
            .obj()
            .one(key)
            .await
            .map_err(unavailable)?;

        match owner {
            Some(owner) => self.get_account(&owner.account_id).await,
            None => Ok(None),
        }
    }

    // ─── Transactions ────────────────────────────────────────────

    /// Run `mutation` against the stored account in a transaction.
    ///
    /// Returns `None` when the account does not exist.
    async fn mutate_account<T, F>(&self, id: &str, mutation: F) -> RepoResult<Option<T>>
    where
        T: Send + 'static,
        F: Fn(&mut Account) -> Mutation<T> + Clone + Send + Sync + 'static,
    {
        let id = id.to_string();
        self.get_client()?
            .run_transaction(move |db, transaction| {
                mutate_in_transaction(db, transaction, id.clone(), mutation.clone()).boxed()
            })
            .await
            .map_err(unavailable)
    }

    async fn mutate_existing<T, F>(&self, id: &str, mutation: F) -> RepoResult<T>
    where
        T: Send + 'static,
        F: Fn(&mut Account) -> Mutation<T> + Clone + Send + Sync + 'static,
    {
        self.mutate_account(id, mutation)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("account {id}")))
    }
}

async fn mutate_in_transaction<T, F>(
    db: firestore::FirestoreDb,
    transaction: &mut FirestoreTransaction<'_>,
    id: String,
    mutation: F,
) -> TxResult<Option<T>>
where
    F: Fn(&mut Account) -> Mutation<T>,
{
    let current: Option<Account> = db
        .fluent()
        .select()
        .by_id_in(collections::ACCOUNTS)
        .obj()
        .one(&id)
        .await?;

    let Some(mut account) = current else {
        return Ok(None);
    };

    match mutation(&mut account) {
        Mutation::Skip(value) => Ok(Some(value)),
        Mutation::Write(value) => {
            db.fluent()
                .update()
                .in_col(collections::ACCOUNTS)
                .document_id(&id)
                .object(&account)
                .add_to_transaction(transaction)?;
            Ok(Some(value))
        }
    }
}

async fn create_in_transaction(
    db: firestore::FirestoreDb,
    transaction: &mut FirestoreTransaction<'_>,
    account: Account,
) -> TxResult<CreateOutcome> {
    let keys = unique_keys(&account);

    // All reads happen before any write.
    let mut owners = Vec::with_capacity(keys.len());
    for (field, key) in &keys {
        let owner: Option<AccountKey> = db
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNT_KEYS)
            .obj()
            .one(key)
            .await?;
        owners.push((*field, owner));
    }

    for (field, owner) in &owners {
        let Some(owner) = owner else { continue };
        if *field == UniqueField::Subject {
            let existing: Option<Account> = db
                .fluent()
                .select()
                .by_id_in(collections::ACCOUNTS)
                .obj()
                .one(&owner.account_id)
                .await?;
            if let Some(existing) = existing {
                return Ok(CreateOutcome::Existing(existing));
            }
        }
        return Ok(CreateOutcome::Conflict(*field));
    }

    db.fluent()
        .update()
        .in_col(collections::ACCOUNTS)
        .document_id(&account.id)
        .object(&account)
        .add_to_transaction(transaction)?;

    let owner = AccountKey {
        account_id: account.id.clone(),
    };
    for (_, key) in &keys {
        db.fluent()
            .update()
            .in_col(collections::ACCOUNT_KEYS)
            .document_id(key)
            .object(&owner)
            .add_to_transaction(transaction)?;
    }

    Ok(CreateOutcome::Created(account))
}

#[async_trait]
impl AccountRepository for FirestoreDb {
    async fn find_by_id(&self, id: &str) -> RepoResult<Option<Account>> {
        self.get_account(id).await
    }

    async fn find_by_subject(&self, subject_id: &str) -> RepoResult<Option<Account>> {
        Ok(self
            .account_for_key(&unique_key(UniqueField::Subject, subject_id))
            .await?
            .filter(|a| a.active))
    }

    async fn find_by_wallet(&self, wallet_address: &str) -> RepoResult<Option<Account>> {
        let Some(wallet) = WalletAddress::parse(wallet_address) else {
            return Ok(None);
        };
        Ok(self
            .account_for_key(&unique_key(UniqueField::Wallet, wallet.as_str()))
            .await?
            .filter(|a| a.active))
    }

    async fn create_if_absent(&self, candidate: NewAccount) -> RepoResult<CreateOutcome> {
        let account = Account::from_new(uuid::Uuid::new_v4().to_string(), candidate, Utc::now());

        let outcome = self
            .get_client()?
            .run_transaction(move |db, transaction| {
                create_in_transaction(db, transaction, account.clone()).boxed()
            })
            .await
            .map_err(unavailable)?;

        if let CreateOutcome::Created(account) = &outcome {
            tracing::info!(account_id = %account.id, "Account stored");
        }
        Ok(outcome)
    }

    async fn record_login(&self, id: &str, login: &LoginContext) -> RepoResult<Account> {
        let login = login.clone();
        self.mutate_existing(id, move |account| {
            account.record_login(&login, Utc::now());
            Mutation::Write(account.clone())
        })
        .await
    }

    async fn push_refresh_token(
        &self,
        id: &str,
        entry: RefreshTokenEntry,
        max: usize,
    ) -> RepoResult<()> {
        self.mutate_existing(id, move |account| {
            account.push_refresh_token(entry.clone(), max, Utc::now());
            Mutation::Write(())
        })
        .await
    }

    async fn remove_refresh_token(&self, id: &str, token_hash: &str) -> RepoResult<bool> {
        let token_hash = token_hash.to_string();
        let removed = self
            .mutate_account(id, move |account| {
                if account.remove_refresh_token(&token_hash, Utc::now()) {
                    Mutation::Write(true)
                } else {
                    Mutation::Skip(false)
                }
            })
            .await?;
        Ok(removed.unwrap_or(false))
    }

    async fn rotate_refresh_token(
        &self,
        id: &str,
        old_hash: &str,
        new_entry: RefreshTokenEntry,
        max: usize,
    ) -> RepoResult<bool> {
        let old_hash = old_hash.to_string();
        self.mutate_existing(id, move |account| {
            let now = Utc::now();
            if !account.remove_refresh_token(&old_hash, now) {
                return Mutation::Skip(false);
            }
            account.push_refresh_token(new_entry.clone(), max, now);
            Mutation::Write(true)
        })
        .await
    }

    async fn clear_refresh_tokens(&self, id: &str) -> RepoResult<bool> {
        let cleared = self
            .mutate_account(id, |account| {
                if account.refresh_tokens.is_empty() {
                    return Mutation::Skip(false);
                }
                account.clear_refresh_tokens(Utc::now());
                Mutation::Write(true)
            })
            .await?;
        Ok(cleared.unwrap_or(false))
    }

    async fn deactivate(&self, id: &str) -> RepoResult<()> {
        self.mutate_existing(id, |account| {
            account.active = false;
            account.clear_refresh_tokens(Utc::now());
            Mutation::Write(())
        })
        .await
    }

    async fn reactivate(&self, id: &str) -> RepoResult<()> {
        self.mutate_existing(id, |account| {
            account.active = true;
            account.updated_at = Utc::now();
            Mutation::Write(())
        })
        .await
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> RepoResult<Account> {
        let update = update.clone();
        self.mutate_existing(id, move |account| {
            account.apply_profile_update(&update, Utc::now());
            Mutation::Write(account.clone())
        })
        .await
    }
}
