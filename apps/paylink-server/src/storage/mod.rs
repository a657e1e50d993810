// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for links, payments, products, users and SIWE nonces
//! in a single redb file under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   paylink.redb     # all collections and their indexes
//! ```
//!
//! Writes that touch a document and its indexes run in one transaction, so
//! an index never points at a missing document.

pub mod database;
pub mod repository;

pub use database::{Store, StoreError, StoreResult};
pub use repository::{
    EarningsSummary, NewPayment, NonceRepository, Payment, PaymentLink, PaymentLinkFilter,
    PaymentLinkRepository, PaymentLinkStatus, PaymentLinkType, PaymentRepository, PaymentStatus,
    PayoutStatus, Product, ProductCounts, ProductRepository, User, UserProfile, UserRepository,
};

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "paylink.redb";
