// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paylink - Payment Links with USDC Settlement
//!
//! Sellers create shareable payment links; buyers pay by card through Stripe
//! and settlement is verified as a USDC transfer on Base. Seller funds sit in
//! custodial wallets managed by Blockradar, and sellers sign in with their
//! Ethereum wallet (SIWE).
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - SIWE sign-in and session tokens
//! - `blockchain` - USDC transfer verification on Base
//! - `providers` - Stripe and Blockradar clients
//! - `storage` - Embedded document store (redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;
