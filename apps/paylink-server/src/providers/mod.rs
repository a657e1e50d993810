// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Third-party payment and custody providers.

pub mod blockradar;
pub mod stripe;

pub use blockradar::{AssetBalance, BlockradarClient, BlockradarError, CustodialAddress, CustodialWallets};
pub use self::stripe::{CreatePaymentIntent, PaymentIntent, PaymentProcessor, StripeClient, StripeError};

#[cfg(test)]
pub use blockradar::MockCustodialWallets;
#[cfg(test)]
pub use self::stripe::MockPaymentProcessor;
