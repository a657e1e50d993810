// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-use SIWE nonces with an expiry.

use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::super::database::{Store, StoreError, StoreResult, SIWE_NONCES};

pub struct NonceRepository<'a> {
    store: &'a Store,
}

impl<'a> NonceRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Record a freshly issued nonce.
    pub fn issue(&self, nonce: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.store.write(|txn| {
            let mut table = txn.open_table(SIWE_NONCES)?;
            let taken = table.get(nonce)?.is_some();
            if taken {
                return Err(StoreError::AlreadyExists(format!("Nonce {nonce}")));
            }
            let expiry = expires_at.timestamp().to_be_bytes();
            table.insert(nonce, expiry.as_slice())?;
            Ok(())
        })
    }

    /// Remove a nonce, failing if it was never issued, already used, or
    /// expired at `now`.
    ///
    /// An expired nonce is removed as well.
    pub fn consume(&self, nonce: &str, now: DateTime<Utc>) -> StoreResult<()> {
        self.store.write(|txn| {
            let mut table = txn.open_table(SIWE_NONCES)?;
            let removed = table.remove(nonce)?.map(|v| v.value().to_vec());
            let Some(bytes) = removed else {
                return Err(StoreError::NotFound(format!("Nonce {nonce}")));
            };
            let expiry = <[u8; 8]>::try_from(bytes.as_slice())
                .map(i64::from_be_bytes)
                .map_err(|_| StoreError::InvalidState("corrupt nonce expiry".to_string()))?;
            if now.timestamp() > expiry {
                // Commit the removal, then report the expiry to the caller
                return Ok(Err(StoreError::InvalidState(format!("Nonce {nonce} expired"))));
            }
            Ok(Ok(()))
        })?
    }
}
