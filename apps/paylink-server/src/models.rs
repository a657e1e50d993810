// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Shared API Models
//!
//! Money conversion, address normalization and pagination types used by
//! several handlers.
//!
//! ## Amounts
//!
//! Fiat amounts travel as `f64` in major units (dollars). USDC amounts are
//! integer strings in 10⁻⁶ units. The conversion rounds to cents first so
//! `usdc == usd * 1e6` holds exactly for every cent-precise amount.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// USDC uses 6 decimals on every supported chain.
pub const USDC_DECIMALS: u8 = 6;

/// USDC base units per cent (`1e6 / 100`).
const USDC_UNITS_PER_CENT: u128 = 10_000;

/// Convert a major-unit amount to minor units (cents), as Stripe expects.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Round a major-unit amount to whole cents.
///
/// Stored USD amounts go through this so they agree with the Stripe charge
/// and the derived USDC amount.
pub fn round_to_cents(amount: f64) -> f64 {
    to_minor_units(amount) as f64 / 100.0
}

/// Convert a USD amount to USDC base units.
///
/// Negative amounts clamp to zero; callers validate positivity first.
pub fn usd_to_usdc_units(amount_usd: f64) -> u128 {
    let cents = to_minor_units(amount_usd).max(0) as u128;
    cents * USDC_UNITS_PER_CENT
}

/// USDC base units as the integer string stored on records.
pub fn usd_to_usdc_string(amount_usd: f64) -> String {
    usd_to_usdc_units(amount_usd).to_string()
}

/// Format a USD value with two decimals.
pub fn format_usd(value: f64) -> String {
    format!("{value:.2}")
}

/// Validate a finite amount worth at least one cent.
pub fn validate_positive_amount(amount: f64) -> Result<(), String> {
    if !amount.is_finite() {
        return Err("Amount must be a number".to_string());
    }
    if amount <= 0.0 {
        return Err("Amount must be greater than 0".to_string());
    }
    if to_minor_units(amount) < 1 {
        return Err("Amount must be at least 0.01".to_string());
    }
    Ok(())
}

/// Validate and normalize an ISO-4217 style currency code to lower case.
pub fn normalize_currency(raw: &str) -> Result<String, String> {
    let code = raw.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err("Currency must be a 3-letter code".to_string());
    }
    Ok(code.to_ascii_lowercase())
}

/// Validate an EVM address (`0x` + 40 hex characters) and lower-case it.
pub fn normalize_address(address: &str) -> Result<String, String> {
    let address = address.trim();
    if !address.starts_with("0x") {
        return Err("Address must start with 0x".to_string());
    }
    if address.len() != 42 {
        return Err("Address must be 42 characters (0x + 40 hex)".to_string());
    }
    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("Address must contain only hex characters".to_string());
    }
    Ok(address.to_ascii_lowercase())
}

/// Treat blank strings from query parameters as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Pagination
// =============================================================================

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Offset/limit pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: usize, offset: usize, limit: usize) -> Self {
        Self {
            total,
            offset,
            limit,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// Slice one page out of a full result set.
pub fn paginate<T>(items: Vec<T>, offset: usize, limit: usize) -> (Vec<T>, Pagination) {
    let pagination = Pagination::new(items.len(), offset, limit);
    let page = items.into_iter().skip(offset).take(limit).collect();
    (page, pagination)
}
