// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for USDC settlement on Base.
//!
//! This module provides functionality for:
//! - Network constants (chain id, RPC, USDC contract)
//! - Decoding ERC-20 `Transfer` logs
//! - Verifying that a transaction paid a seller

pub mod erc20;
pub mod types;
pub mod verifier;

pub use types::*;
pub use verifier::{ChainVerifier, PaymentVerifier, VerifierError};

#[cfg(test)]
pub use verifier::MockPaymentVerifier;
