// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-chain USDC payment verification.
//!
//! A payment is verified when its transaction receipt exists, succeeded,
//! carries a USDC `Transfer` of at least the expected amount to the
//! expected recipient, and has reached the configured confirmation depth.

use std::str::FromStr;

use alloy::{
    network::Ethereum,
    primitives::{Address, B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
};
use async_trait::async_trait;
use serde_json::json;

use super::erc20::{token_transfers, TokenTransfer};
use super::types::{
    BlockchainVerificationError, NetworkConfig, VerificationErrorCode, VerificationOutcome,
    VerificationRequest,
};

/// HTTP provider type (with the recommended fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Errors from payment verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// The transaction itself cannot satisfy the payment
    #[error(transparent)]
    Verification(#[from] BlockchainVerificationError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Invalid verifier input: {0}")]
    InvalidConfig(String),
}

/// Checks that a transaction settled a USDC payment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify_usdc_transfer(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationOutcome, VerifierError>;
}

/// RPC-backed verifier for the configured network.
pub struct ChainVerifier {
    network: NetworkConfig,
    usdc: Address,
    min_confirmations: u64,
    provider: HttpProvider,
}

impl ChainVerifier {
    pub fn new(
        network: NetworkConfig,
        rpc_url: &str,
        min_confirmations: u64,
    ) -> Result<Self, VerifierError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| VerifierError::InvalidConfig(format!("RPC URL: {e}")))?;
        let usdc = Address::from_str(network.usdc_address)
            .map_err(|e| VerifierError::InvalidConfig(format!("USDC address: {e}")))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            network,
            usdc,
            min_confirmations,
            provider,
        })
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

#[async_trait]
impl PaymentVerifier for ChainVerifier {
    async fn verify_usdc_transfer(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationOutcome, VerifierError> {
        let hash = parse_tx_hash(&request.transaction_hash)?;
        let recipient = Address::from_str(&request.expected_recipient).map_err(|e| {
            VerifierError::InvalidConfig(format!(
                "recipient {}: {e}",
                request.expected_recipient
            ))
        })?;

        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| VerifierError::Rpc(format!("Failed to get receipt: {e}")))?
            .ok_or_else(|| {
                BlockchainVerificationError::new(
                    VerificationErrorCode::TransactionNotFound,
                    "Transaction not found",
                    json!({
                        "transactionHash": request.transaction_hash,
                        "network": self.network.id,
                    }),
                )
            })?;

        if !receipt.status() {
            return Err(BlockchainVerificationError::new(
                VerificationErrorCode::TransactionReverted,
                "Transaction failed on-chain",
                json!({
                    "transactionHash": request.transaction_hash,
                    "explorerUrl": self.network.tx_url(&request.transaction_hash),
                }),
            )
            .into());
        }

        let head = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| VerifierError::Rpc(format!("Failed to get block number: {e}")))?;
        let block_number = receipt.block_number;
        let confirmations = confirmations(head, block_number);

        let transfers = token_transfers(receipt.inner.logs(), self.usdc);

        tracing::debug!(
            tx_hash = %request.transaction_hash,
            transfers = transfers.len(),
            confirmations,
            "Evaluating USDC transfers"
        );

        let outcome = evaluate_transfers(
            &transfers,
            recipient,
            U256::from(request.expected_amount),
            confirmations,
            self.min_confirmations,
        )
        .map_err(|mut e| {
            e.details["transactionHash"] = json!(request.transaction_hash);
            e.details["usdcContract"] = json!(self.network.usdc_address);
            e
        })?;

        Ok(VerificationOutcome {
            block_number: block_number.unwrap_or_default(),
            ..outcome
        })
    }
}

fn parse_tx_hash(raw: &str) -> Result<B256, BlockchainVerificationError> {
    let trimmed = raw.trim();
    let valid = trimmed.len() == 66
        && trimmed.starts_with("0x")
        && trimmed[2..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(invalid_hash(raw));
    }
    B256::from_str(trimmed).map_err(|_| invalid_hash(raw))
}

fn invalid_hash(raw: &str) -> BlockchainVerificationError {
    BlockchainVerificationError::new(
        VerificationErrorCode::InvalidTransactionHash,
        "Invalid transaction hash",
        json!({ "transactionHash": raw }),
    )
}

/// `head - block + 1`, or zero while the transaction is unmined.
fn confirmations(head: u64, block_number: Option<u64>) -> u64 {
    match block_number {
        Some(block) if head >= block => head - block + 1,
        Some(_) => 1,
        None => 0,
    }
}

/// Decide whether decoded USDC transfers settle the expected payment.
///
/// The reported transfer is the one to the expected recipient if any,
/// otherwise the first transfer in the receipt.
pub(crate) fn evaluate_transfers(
    transfers: &[TokenTransfer],
    expected_recipient: Address,
    expected_amount: U256,
    confirmations: u64,
    min_confirmations: u64,
) -> Result<VerificationOutcome, BlockchainVerificationError> {
    let Some(first) = transfers.first() else {
        return Err(BlockchainVerificationError::new(
            VerificationErrorCode::NoUsdcTransfer,
            "No USDC transfer found in transaction",
            json!({}),
        ));
    };

    let to_recipient = transfers
        .iter()
        .filter(|t| t.to == expected_recipient)
        .max_by_key(|t| t.value);
    let reported = to_recipient.unwrap_or(first);

    let reason = match to_recipient {
        None => Some(format!(
            "USDC was sent to {:#x}, expected {:#x}",
            reported.to, expected_recipient
        )),
        Some(t) if t.value < expected_amount => Some(format!(
            "Transferred {} USDC units, expected at least {}",
            t.value, expected_amount
        )),
        Some(_) if confirmations < min_confirmations => Some(format!(
            "Transaction has {confirmations} confirmations, {min_confirmations} required"
        )),
        Some(_) => None,
    };

    Ok(VerificationOutcome {
        verified: reason.is_none(),
        actual_amount: reported.value.to_string(),
        actual_recipient: format!("{:#x}", reported.to),
        confirmations,
        block_number: 0,
        reason,
    })
}
