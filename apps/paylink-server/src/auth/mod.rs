// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Sign-In With Ethereum for sellers, followed by a signed session token.
//!
//! ## Auth Flow
//!
//! 1. Frontend requests a nonce from `GET /api/auth/nonce`
//! 2. The wallet signs an EIP-4361 message containing that nonce
//! 3. `POST /api/auth/verify` checks the message and its EIP-191 signature:
//!    - domain and chain id must match the configuration
//!    - the nonce must be known, unexpired and unused (it is consumed)
//!    - the signature must recover to the message address
//! 4. The server returns an HS256 session token
//! 5. Frontend sends `Authorization: Bearer <token>`; handlers use [`Auth`]

pub mod claims;
pub mod error;
pub mod extractor;
pub mod siwe;

pub use claims::{issue_session_token, verify_session_token, AuthenticatedSession, SessionClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use self::siwe::{generate_nonce, Eip191Verifier, SignatureVerifier, SiweMessage};
