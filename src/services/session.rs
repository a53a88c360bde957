// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity-to-session lifecycle: issue, refresh and revoke.
//!
//! Issuance walks `Unauthenticated -> ClaimsValidated -> AddressBound ->
//! AccountResolved -> SessionIssued`. A failure at any stage rejects the
//! request; only account resolution and token list updates write to storage,
//! and no token is returned unless its list entry was committed.

use std::sync::Arc;

use crate::config::Config;
use crate::db::{AccountRepository, CreateOutcome, UniqueField};
use crate::error::AuthError;
use crate::models::{Account, LoginContext, NewAccount, WalletAddress};
use crate::services::address::{addresses_equal, AddressBinder, AddressDerivation};
use crate::services::claims::{ClaimExtractor, IdentityClaims};
use crate::services::prover::{EphemeralMaterial, ProofAttestation, ProofGateway, ProofRequest};
use crate::services::tokens::{TokenKind, TokenService};
use crate::services::verifier::SessionVerifier;

/// Progress of a single issuance, recorded on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStage {
    Unauthenticated,
    ClaimsValidated,
    AddressBound,
    AccountResolved,
    SessionIssued,
}

/// Input to [`SessionService::issue`].
#[derive(Debug, Clone)]
pub struct IssueSessionRequest {
    pub identity_token: String,
    pub wallet_address: String,
    pub salt: String,
    /// Overrides the token's `aud` claim when stored on a new account
    pub audience: Option<String>,
    /// Required when proofs are enforced at login
    pub ephemeral: Option<EphemeralMaterial>,
    pub login: LoginContext,
}

/// Outcome of a successful issuance or refresh.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub account: Account,
    pub access_token: String,
    pub refresh_token: String,
    /// True only for the call that created the account
    pub created: bool,
}

/// Acknowledgement of a revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevokeAck {
    /// Whether a listed token was actually removed
    pub removed: bool,
    pub revoked_all: bool,
}

pub struct SessionService {
    repo: Arc<dyn AccountRepository>,
    claims: ClaimExtractor,
    binder: AddressBinder,
    tokens: Arc<TokenService>,
    verifier: SessionVerifier,
    prover: Arc<dyn ProofGateway>,
    require_proof: bool,
    max_refresh_tokens: usize,
}

impl SessionService {
    pub fn new(
        config: &Config,
        repo: Arc<dyn AccountRepository>,
        derivation: Arc<dyn AddressDerivation>,
        prover: Arc<dyn ProofGateway>,
    ) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenService::new(config)?);
        Ok(Self {
            verifier: SessionVerifier::new(repo.clone(), tokens.clone()),
            repo,
            claims: ClaimExtractor::new(config.trusted_issuer.clone()),
            binder: AddressBinder::new(derivation),
            tokens,
            prover,
            require_proof: config.require_proof_on_login,
            max_refresh_tokens: config.max_refresh_tokens,
        })
    }

    pub fn verifier(&self) -> &SessionVerifier {
        &self.verifier
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn repository(&self) -> &Arc<dyn AccountRepository> {
        &self.repo
    }

    // ─── Issue ───────────────────────────────────────────────────

    /// Exchange an identity token and wallet binding for a session.
    pub async fn issue(&self, request: IssueSessionRequest) -> Result<SessionResult, AuthError> {
        let mut stage = IssueStage::Unauthenticated;
        match self.run_issue(&request, &mut stage).await {
            Ok(result) => {
                tracing::info!(
                    account_id = %result.account.id,
                    created = result.created,
                    login_count = result.account.login_count,
                    "Session issued"
                );
                Ok(result)
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::error!(stage = ?stage, error = %err, "Session issuance failed");
                } else {
                    tracing::warn!(
                        stage = ?stage,
                        reason = err.error_code(),
                        "Session issuance rejected"
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_issue(
        &self,
        request: &IssueSessionRequest,
        stage: &mut IssueStage,
    ) -> Result<SessionResult, AuthError> {
        let claims = self.claims.extract(&request.identity_token)?;
        *stage = IssueStage::ClaimsValidated;

        let supplied =
            WalletAddress::parse(&request.wallet_address).ok_or(AuthError::WalletAddressMismatch)?;
        let bound = self.binder.bind(&claims.subject_id, &request.salt);
        *stage = IssueStage::AddressBound;

        if self.require_proof {
            self.prove(&request.identity_token, &request.salt, request.ephemeral.as_ref())
                .await?;
        }

        let (account, created) = self
            .resolve_account(&claims, request, &supplied, bound)
            .await?;
        *stage = IssueStage::AccountResolved;

        let pair = self.tokens.issue_pair(&account)?;
        self.repo
            .push_refresh_token(&account.id, pair.refresh.entry, self.max_refresh_tokens)
            .await?;
        *stage = IssueStage::SessionIssued;

        Ok(SessionResult {
            account,
            access_token: pair.access_token,
            refresh_token: pair.refresh.token,
            created,
        })
    }

    /// Find the subject's account, or create it. Returns the account and
    /// whether this call created it.
    async fn resolve_account(
        &self,
        claims: &IdentityClaims,
        request: &IssueSessionRequest,
        supplied: &WalletAddress,
        bound: WalletAddress,
    ) -> Result<(Account, bool), AuthError> {
        if let Some(account) = self.repo.find_by_subject(&claims.subject_id).await? {
            return self.login_existing(account, supplied, &bound, &request.login).await;
        }

        // New subject: the caller must present the address we just derived.
        if !addresses_equal(supplied, &bound) {
            return Err(AuthError::WalletAddressMismatch);
        }

        let candidate = NewAccount {
            subject_id: claims.subject_id.clone(),
            email: claims.email.clone(),
            wallet_address: bound.clone(),
            salt: request.salt.clone(),
            issuer: claims.issuer.clone(),
            audience: request
                .audience
                .clone()
                .or_else(|| claims.audience.clone())
                .unwrap_or_default(),
            name: claims.name.clone(),
            picture: claims.picture.clone(),
            login: request.login.clone(),
        };

        match self.repo.create_if_absent(candidate).await? {
            CreateOutcome::Created(account) => {
                tracing::info!(account_id = %account.id, "Account created");
                Ok((account, true))
            }
            CreateOutcome::Existing(winner) => {
                // Lost a creation race for this subject.
                if !winner.active {
                    return Err(AuthError::AccountInactiveOrMissing);
                }
                if winner.email != claims.email || !addresses_equal(&winner.wallet_address, &bound)
                {
                    return Err(AuthError::ConflictingIdentity);
                }
                self.login_existing(winner, supplied, &bound, &request.login)
                    .await
            }
            CreateOutcome::Conflict(UniqueField::Email) => Err(AuthError::EmailTaken),
            CreateOutcome::Conflict(UniqueField::Wallet) => Err(AuthError::WalletTaken),
            CreateOutcome::Conflict(UniqueField::Subject | UniqueField::Salt) => {
                Err(AuthError::ConflictingIdentity)
            }
        }
    }

    async fn login_existing(
        &self,
        account: Account,
        supplied: &WalletAddress,
        bound: &WalletAddress,
        login: &LoginContext,
    ) -> Result<(Account, bool), AuthError> {
        self.binder.check_stored(&account, bound)?;
        if !addresses_equal(supplied, &account.wallet_address) {
            return Err(AuthError::WalletAddressMismatch);
        }
        let account = self.repo.record_login(&account.id, login).await?;
        Ok((account, false))
    }

    async fn prove(
        &self,
        identity_token: &str,
        salt: &str,
        material: Option<&EphemeralMaterial>,
    ) -> Result<ProofAttestation, AuthError> {
        let material = material.ok_or_else(|| {
            AuthError::ProofRejected("ephemeral session material is required".to_string())
        })?;
        let request = ProofRequest::new(identity_token, salt, material);
        Ok(self.prover.acquire(&request).await?)
    }

    // ─── Refresh ─────────────────────────────────────────────────

    /// Rotate a refresh token: the presented token is consumed and a new pair issued.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionResult, AuthError> {
        let verified = self.verifier.verify_refresh(refresh_token).await?;
        let account = verified.account;

        let pair = self.tokens.issue_pair(&account)?;
        let rotated = self
            .repo
            .rotate_refresh_token(
                &account.id,
                &verified.token_hash,
                pair.refresh.entry,
                self.max_refresh_tokens,
            )
            .await?;

        if !rotated {
            // A concurrent refresh consumed the same token first.
            tracing::warn!(account_id = %account.id, "Refresh token replayed");
            return Err(AuthError::RefreshTokenRevoked);
        }

        tracing::info!(account_id = %account.id, "Session refreshed");
        Ok(SessionResult {
            account,
            access_token: pair.access_token,
            refresh_token: pair.refresh.token,
            created: false,
        })
    }

    // ─── Revoke ──────────────────────────────────────────────────

    /// Log out one device (the presented refresh token) or every device.
    ///
    /// Access tokens already issued stay valid until they expire.
    pub async fn revoke(
        &self,
        account_id: &str,
        refresh_token: Option<&str>,
        revoke_all: bool,
    ) -> Result<RevokeAck, AuthError> {
        if revoke_all {
            let removed = self.repo.clear_refresh_tokens(account_id).await?;
            tracing::info!(account_id = %account_id, removed, "All sessions revoked");
            return Ok(RevokeAck {
                removed,
                revoked_all: true,
            });
        }

        let Some(token) = refresh_token else {
            return Ok(RevokeAck {
                removed: false,
                revoked_all: false,
            });
        };

        match self.tokens.decode(token, TokenKind::Refresh) {
            Ok(claims) if claims.account_id != account_id => return Err(AuthError::InvalidToken),
            Ok(_) => {}
            // An expired token is no longer accepted anywhere.
            Err(AuthError::ExpiredToken) => {
                return Ok(RevokeAck {
                    removed: false,
                    revoked_all: false,
                })
            }
            Err(err) => return Err(err),
        }

        let removed = self
            .repo
            .remove_refresh_token(account_id, &self.tokens.hash_refresh_token(token))
            .await?;
        tracing::info!(account_id = %account_id, removed, "Session revoked");
        Ok(RevokeAck {
            removed,
            revoked_all: false,
        })
    }

    // ─── Account operations ──────────────────────────────────────

    /// Soft-delete the account; its refresh tokens stop verifying immediately.
    pub async fn deactivate(&self, account_id: &str) -> Result<(), AuthError> {
        self.repo.deactivate(account_id).await?;
        tracing::info!(account_id = %account_id, "Account deactivated");
        Ok(())
    }

    /// Wallet bound to the identity token's subject, if it has an active account.
    pub async fn wallet_for_identity(
        &self,
        identity_token: &str,
    ) -> Result<Option<WalletAddress>, AuthError> {
        let claims = self.claims.extract(identity_token)?;
        Ok(self
            .repo
            .find_by_subject(&claims.subject_id)
            .await?
            .map(|account| account.wallet_address))
    }

    /// Request a proof for the account's own identity token.
    pub async fn acquire_proof(
        &self,
        account: &Account,
        identity_token: &str,
        material: &EphemeralMaterial,
    ) -> Result<ProofAttestation, AuthError> {
        let claims = self.claims.extract(identity_token)?;
        if claims.subject_id != account.subject_id {
            return Err(AuthError::ProofRejected(
                "identity token belongs to a different account".to_string(),
            ));
        }
        let attestation = self
            .prove(identity_token, &account.salt, Some(material))
            .await?;
        tracing::info!(account_id = %account.id, "Proof acquired");
        Ok(attestation)
    }
}
