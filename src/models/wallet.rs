// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wallet address newtype.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hex digits in a wallet address (32 bytes).
pub const WALLET_HEX_LEN: usize = 64;

/// A `0x`-prefixed 32-byte wallet address, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize a caller-supplied address.
    ///
    /// Returns `None` unless the input is `0x` followed by exactly 64 hex digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))?;
        if digits.len() != WALLET_HEX_LEN || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(WalletAddress(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Build an address from raw 32-byte output of a derivation function.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        WalletAddress(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// `validator` hook for request DTOs carrying a wallet address string.
pub fn validate_wallet_address(value: &str) -> Result<(), validator::ValidationError> {
    match WalletAddress::parse(value) {
        Some(_) => Ok(()),
        None => Err(validator::ValidationError::new("wallet_address")),
    }
}
