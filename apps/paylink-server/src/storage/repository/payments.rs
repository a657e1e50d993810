// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment repository.
//!
//! A payment is created `pending` when a Stripe payment intent is
//! established and moves exactly once, to `completed` or `failed`.
//! Status changes go through [`PaymentRepository::update`], which performs
//! the read-modify-write inside a single redb write transaction.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    load_document, make_index_key, put_document, Store, StoreError, StoreResult, PAYMENTS,
    PAYMENTS_BY_INTENT, PAYMENTS_BY_LINK, PAYMENTS_BY_SELLER, PAYMENTS_BY_TX_HASH,
};
use crate::models::{round_to_cents, usd_to_usdc_string};

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting card capture or on-chain verification
    #[default]
    Pending,
    /// Funds received; terminal
    Completed,
    /// Payment failed or was cancelled; terminal
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Only `pending → completed` and `pending → failed` are allowed.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed) | (Self::Pending, Self::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Seller payout status, tracked independently of the payment itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Stored payment record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    /// Slug of the payment link this payment was made through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub seller_id: String,
    /// Amount in USD major units
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    /// Amount in USDC base units (6 decimals), integer string
    #[serde(rename = "amountUSDC")]
    pub amount_usdc: String,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockradar_transaction_id: Option<String>,
    pub payout_status: PayoutStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields supplied when a payment is first recorded.
#[derive(Debug, Clone, Default)]
pub struct NewPayment {
    pub seller_id: String,
    pub payment_link: Option<String>,
    pub product_id: Option<String>,
    pub amount_usd: f64,
    pub currency: String,
    pub stripe_payment_intent_id: Option<String>,
    pub buyer_email: Option<String>,
    pub buyer_name: Option<String>,
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("payment cannot move from {} to {}", from.as_str(), to.as_str())]
pub struct InvalidTransition {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
}

impl From<InvalidTransition> for StoreError {
    fn from(e: InvalidTransition) -> Self {
        StoreError::InvalidState(e.to_string())
    }
}

impl Payment {
    /// Create a new pending payment.
    ///
    /// The USD amount is rounded to cents and the USDC amount derives from it.
    pub fn new_pending(new: NewPayment) -> Self {
        let now = Utc::now();
        let amount_usd = round_to_cents(new.amount_usd);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            payment_link: new.payment_link,
            product_id: new.product_id,
            seller_id: new.seller_id,
            amount_usd,
            amount_usdc: usd_to_usdc_string(amount_usd),
            currency: new.currency,
            status: PaymentStatus::Pending,
            transaction_hash: None,
            stripe_payment_intent_id: new.stripe_payment_intent_id,
            blockradar_transaction_id: None,
            payout_status: PayoutStatus::Pending,
            buyer_email: new.buyer_email,
            buyer_name: new.buyer_name,
            buyer_wallet_address: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn transition(&mut self, next: PaymentStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the payment as completed, stamping the settlement hash if known.
    pub fn complete(&mut self, transaction_hash: Option<String>) -> Result<(), InvalidTransition> {
        self.transition(PaymentStatus::Completed)?;
        if transaction_hash.is_some() {
            self.transaction_hash = transaction_hash;
        }
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// Mark the payment as failed.
    pub fn fail(&mut self) -> Result<(), InvalidTransition> {
        self.transition(PaymentStatus::Failed)
    }

    /// USDC amount as an integer; malformed values count as zero.
    pub fn amount_usdc_units(&self) -> u128 {
        self.amount_usdc.parse().unwrap_or(0)
    }
}

/// Lifetime earnings over completed payments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EarningsSummary {
    pub total_usd: f64,
    pub total_usdc: u128,
    pub count: u64,
}

/// Repository for payment operations.
pub struct PaymentRepository<'a> {
    store: &'a Store,
}

impl<'a> PaymentRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert a new payment and its index entries.
    pub fn create(&self, payment: &Payment) -> StoreResult<()> {
        self.store.write(|txn| {
            {
                let ts = payment.created_at.timestamp_millis();

                let mut by_seller = txn.open_table(PAYMENTS_BY_SELLER)?;
                let key = make_index_key(&payment.seller_id, ts, &payment.id);
                by_seller.insert(key.as_slice(), payment.id.as_str())?;

                if let Some(slug) = &payment.payment_link {
                    let mut by_link = txn.open_table(PAYMENTS_BY_LINK)?;
                    let key = make_index_key(slug, ts, &payment.id);
                    by_link.insert(key.as_slice(), payment.id.as_str())?;
                }

                if let Some(intent_id) = &payment.stripe_payment_intent_id {
                    let mut by_intent = txn.open_table(PAYMENTS_BY_INTENT)?;
                    let taken = by_intent.get(intent_id.as_str())?.is_some();
                    if taken {
                        return Err(StoreError::AlreadyExists(format!(
                            "Payment for intent {intent_id}"
                        )));
                    }
                    by_intent.insert(intent_id.as_str(), payment.id.as_str())?;
                }

                if let Some(hash) = &payment.transaction_hash {
                    claim_tx_hash(txn, hash, &payment.id)?;
                }
            }
            put_document(txn, PAYMENTS, &payment.id, payment)
        })
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Payment>> {
        self.store.get_document(PAYMENTS, id)
    }

    /// Get the payment created for a Stripe payment intent.
    pub fn get_by_intent(&self, intent_id: &str) -> StoreResult<Option<Payment>> {
        match self.store.lookup(PAYMENTS_BY_INTENT, intent_id)? {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Get the payment settled by an on-chain transaction.
    pub fn get_by_tx_hash(&self, hash: &str) -> StoreResult<Option<Payment>> {
        match self
            .store
            .lookup(PAYMENTS_BY_TX_HASH, &hash.to_ascii_lowercase())?
        {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Most recent payment made through a payment link.
    pub fn latest_for_link(&self, slug: &str) -> StoreResult<Option<Payment>> {
        let payments: Vec<Payment> =
            self.store.list_by_owner(PAYMENTS_BY_LINK, PAYMENTS, slug)?;
        Ok(payments.into_iter().next())
    }

    /// All payments for a seller, newest first.
    pub fn list_by_seller(&self, seller_id: &str) -> StoreResult<Vec<Payment>> {
        self.store
            .list_by_owner(PAYMENTS_BY_SELLER, PAYMENTS, seller_id)
    }

    /// The `limit` most recent payments for a seller, any status.
    pub fn recent_by_seller(&self, seller_id: &str, limit: usize) -> StoreResult<Vec<Payment>> {
        let mut payments = self.list_by_seller(seller_id)?;
        payments.truncate(limit);
        Ok(payments)
    }

    /// Sum completed payments for a seller.
    pub fn earnings_summary(&self, seller_id: &str) -> StoreResult<EarningsSummary> {
        let summary = self
            .list_by_seller(seller_id)?
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .fold(EarningsSummary::default(), |mut acc, p| {
                acc.total_usd += p.amount_usd;
                acc.total_usdc += p.amount_usdc_units();
                acc.count += 1;
                acc
            });
        Ok(summary)
    }

    /// Atomically load, mutate and persist a payment.
    ///
    /// Returns `NotFound` if the payment does not exist. If `f` fails nothing
    /// is written. A transaction hash set by `f` is claimed in the same
    /// transaction; `AlreadyExists` if another payment already holds it.
    pub fn update<F>(&self, id: &str, f: F) -> StoreResult<Payment>
    where
        F: FnOnce(&mut Payment) -> StoreResult<()>,
    {
        self.store.write(|txn| {
            let mut payment: Payment = load_document(txn, PAYMENTS, id)?
                .ok_or_else(|| StoreError::NotFound(format!("Payment {id}")))?;
            let previous_hash = payment.transaction_hash.clone();
            f(&mut payment)?;
            if payment.transaction_hash != previous_hash {
                if let Some(hash) = &payment.transaction_hash {
                    claim_tx_hash(txn, hash, id)?;
                }
            }
            put_document(txn, PAYMENTS, id, &payment)?;
            Ok(payment)
        })
    }
}

fn claim_tx_hash(txn: &redb::WriteTransaction, hash: &str, payment_id: &str) -> StoreResult<()> {
    let key = hash.to_ascii_lowercase();
    let mut by_tx = txn.open_table(PAYMENTS_BY_TX_HASH)?;
    let holder = by_tx.get(key.as_str())?.map(|v| v.value().to_string());
    match holder {
        Some(existing) if existing != payment_id => Err(StoreError::AlreadyExists(format!(
            "Settlement for transaction {hash}"
        ))),
        _ => {
            by_tx.insert(key.as_str(), payment_id)?;
            Ok(())
        }
    }
}
