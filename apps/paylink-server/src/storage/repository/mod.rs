// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the document store.
//!
//! Each repository borrows the shared [`Store`](super::Store) and provides
//! the queries one collection needs.

pub mod nonces;
pub mod payment_links;
pub mod payments;
pub mod products;
pub mod users;

pub use nonces::NonceRepository;
pub use payment_links::{
    PaymentLink, PaymentLinkFilter, PaymentLinkRepository, PaymentLinkStatus, PaymentLinkType,
};
pub use payments::{
    EarningsSummary, InvalidTransition, NewPayment, Payment, PaymentRepository, PaymentStatus,
    PayoutStatus,
};
pub use products::{Product, ProductCounts, ProductRepository};
pub use users::{User, UserProfile, UserRepository};
