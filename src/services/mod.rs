// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod address;
pub mod claims;
pub mod prover;
pub mod session;
pub mod tokens;
pub mod verifier;

pub use address::{AddressBinder, AddressDerivation, LocalAddressDerivation};
pub use claims::{ClaimExtractor, IdentityClaims};
pub use prover::{EphemeralMaterial, ProofError, ProofGateway, ProverClient};
pub use session::{IssueSessionRequest, IssueStage, RevokeAck, SessionResult, SessionService};
pub use tokens::{SessionClaims, TokenKind, TokenService};
pub use verifier::{SessionVerifier, VerifiedAccess, VerifiedRefresh};
