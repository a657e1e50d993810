// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Settlement network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Identifier used in `CHAIN_NETWORK`
    pub id: &'static str,
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Default public RPC endpoint
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    /// Circle USDC contract on this network
    pub usdc_address: &'static str,
}

/// Base mainnet.
pub const BASE_MAINNET: NetworkConfig = NetworkConfig {
    id: "base",
    name: "Base",
    chain_id: 8453,
    rpc_url: "https://mainnet.base.org",
    explorer_url: "https://basescan.org",
    usdc_address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
};

/// Base Sepolia testnet.
pub const BASE_SEPOLIA: NetworkConfig = NetworkConfig {
    id: "base-sepolia",
    name: "Base Sepolia",
    chain_id: 84532,
    rpc_url: "https://sepolia.base.org",
    explorer_url: "https://sepolia.basescan.org",
    usdc_address: "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
};

impl NetworkConfig {
    /// Resolve a `CHAIN_NETWORK` value.
    pub fn from_id(raw: &str) -> Option<NetworkConfig> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "base" | "base-mainnet" => Some(BASE_MAINNET),
            "base-sepolia" => Some(BASE_SEPOLIA),
            _ => None,
        }
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }
}

/// Machine-readable reasons a transaction cannot be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationErrorCode {
    InvalidTransactionHash,
    TransactionNotFound,
    TransactionReverted,
    NoUsdcTransfer,
}

impl VerificationErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTransactionHash => "INVALID_TRANSACTION_HASH",
            Self::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            Self::TransactionReverted => "TRANSACTION_REVERTED",
            Self::NoUsdcTransfer => "NO_USDC_TRANSFER",
        }
    }
}

/// Verification failure that callers surface as-is, with its code and details.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct BlockchainVerificationError {
    pub code: VerificationErrorCode,
    pub message: String,
    pub details: Value,
}

impl BlockchainVerificationError {
    pub fn new(code: VerificationErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }
}

/// Input to an on-chain USDC transfer check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub transaction_hash: String,
    /// Address expected to receive the USDC
    pub expected_recipient: String,
    /// Minimum amount in USDC base units
    pub expected_amount: u128,
}

/// Result of checking a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub verified: bool,
    /// Transferred amount in USDC base units, integer string
    pub actual_amount: String,
    pub actual_recipient: String,
    pub confirmations: u64,
    pub block_number: u64,
    /// Why `verified` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
