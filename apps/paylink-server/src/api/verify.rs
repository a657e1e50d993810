// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-chain settlement verification for pending payments.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    blockchain::{VerificationOutcome, VerificationRequest},
    error::ApiError,
    models::{non_blank, normalize_address},
    state::AppState,
    storage::{Payment, PaymentRepository, PaymentStatus, Store, UserRepository},
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub transaction_hash: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub verified: bool,
    pub payment: Payment,
    pub verification: VerificationOutcome,
}

/// Address that must receive the seller's USDC.
///
/// The seller's custodial wallet wins over their connected wallet. A seller
/// id that is itself an address and matches no user is used directly.
fn seller_recipient(store: &Store, seller_id: &str) -> Result<String, ApiError> {
    let users = UserRepository::new(store);
    let seller = match users.get(seller_id)? {
        Some(user) => Some(user),
        None => match users.get_by_clerk(seller_id)? {
            Some(user) => Some(user),
            None => users.get_by_wallet(seller_id)?,
        },
    };

    match seller {
        Some(user) => Ok(user
            .custodial_wallet_address
            .clone()
            .unwrap_or(user.wallet_address)),
        None => normalize_address(seller_id)
            .map_err(|_| ApiError::bad_request("Seller has no wallet address to receive USDC")),
    }
}

/// Verify that a transaction paid a pending payment in USDC.
///
/// A positive verification completes the payment. A negative one returns
/// the findings and leaves the payment pending so the caller may retry.
#[utoipa::path(
    post,
    path = "/api/verify-payment",
    tag = "Payments",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Verification result", body = VerifyPaymentResponse),
        (status = 400, description = "Invalid input, payment not pending, or verification error with code and details"),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Transaction already settled another payment"),
        (status = 500, description = "RPC or storage failure")
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let Json(request) = payload?;
    let (Some(transaction_hash), Some(payment_id)) = (
        non_blank(request.transaction_hash),
        non_blank(request.payment_id),
    ) else {
        return Err(ApiError::bad_request(
            "transactionHash and paymentId are required",
        ));
    };

    let repo = PaymentRepository::new(&state.store);
    let payment = repo
        .get(&payment_id)?
        .ok_or_else(|| ApiError::not_found("Payment not found"))?;
    if payment.status != PaymentStatus::Pending {
        return Err(ApiError::bad_request(format!(
            "Payment is already {}",
            payment.status.as_str()
        )));
    }

    if repo.get_by_tx_hash(&transaction_hash)?.is_some() {
        return Err(ApiError::conflict(
            "Transaction has already been used to settle a payment",
        ));
    }

    let recipient = seller_recipient(&state.store, &payment.seller_id)?;
    let outcome = state
        .verifier
        .verify_usdc_transfer(VerificationRequest {
            transaction_hash: transaction_hash.clone(),
            expected_recipient: recipient,
            expected_amount: payment.amount_usdc_units(),
        })
        .await?;

    if !outcome.verified {
        warn!(
            payment_id = %payment.id,
            tx_hash = %transaction_hash,
            reason = ?outcome.reason,
            "Payment verification failed"
        );
        return Ok(Json(VerifyPaymentResponse {
            success: true,
            verified: false,
            payment,
            verification: outcome,
        }));
    }

    let payment = repo.update(&payment.id, |p| {
        p.complete(Some(transaction_hash.clone()))?;
        Ok(())
    })?;

    info!(
        payment_id = %payment.id,
        tx_hash = %transaction_hash,
        confirmations = outcome.confirmations,
        "Payment verified on-chain"
    );

    Ok(Json(VerifyPaymentResponse {
        success: true,
        verified: true,
        payment,
        verification: outcome,
    }))
}
