// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wallet address derivation and binding.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::AuthError;
use crate::models::{Account, WalletAddress};

const DERIVATION_DOMAIN: &[u8] = b"zklogin-address-v1";

/// Deterministic `derive(subject_id, salt) -> address` oracle.
///
/// Implementations must be pure: the same inputs always give the same address.
pub trait AddressDerivation: Send + Sync {
    fn derive(&self, subject_id: &str, salt: &str) -> WalletAddress;
}

/// In-process derivation: SHA-256 over the issuer, subject and salt.
///
/// Each input is length-prefixed so distinct tuples never hash the same bytes.
#[derive(Debug, Clone)]
pub struct LocalAddressDerivation {
    issuer: String,
}

impl LocalAddressDerivation {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }
}

impl AddressDerivation for LocalAddressDerivation {
    fn derive(&self, subject_id: &str, salt: &str) -> WalletAddress {
        let mut hasher = Sha256::new();
        hasher.update(DERIVATION_DOMAIN);
        for part in [self.issuer.as_str(), subject_id, salt] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        WalletAddress::from_bytes(&hasher.finalize().into())
    }
}

/// Binds identities to wallet addresses through the derivation oracle.
#[derive(Clone)]
pub struct AddressBinder {
    derivation: Arc<dyn AddressDerivation>,
}

impl AddressBinder {
    pub fn new(derivation: Arc<dyn AddressDerivation>) -> Self {
        Self { derivation }
    }

    /// Address for a (subject, salt) pair.
    pub fn bind(&self, subject_id: &str, salt: &str) -> WalletAddress {
        self.derivation.derive(subject_id, salt)
    }

    /// Check a freshly bound address against the one stored at creation.
    pub fn check_stored(&self, account: &Account, bound: &WalletAddress) -> Result<(), AuthError> {
        if addresses_equal(&account.wallet_address, bound) {
            Ok(())
        } else {
            Err(AuthError::AddressMismatch)
        }
    }
}

/// Constant-time address comparison.
pub fn addresses_equal(a: &WalletAddress, b: &WalletAddress) -> bool {
    a.as_str().as_bytes().ct_eq(b.as_str().as_bytes()).into()
}
