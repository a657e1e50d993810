// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded document store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! Every collection has a primary table (`id → JSON bytes`) and one or more
//! index tables:
//!
//! - `payment_links`, `payment_link_slugs` (slug → id),
//!   `payment_links_by_seller` (len|seller|!timestamp|id → id)
//! - `payments`, `payments_by_seller`, `payments_by_link`,
//!   `payments_by_intent` (Stripe intent id → id)
//! - `products`, `products_by_seller`
//! - `users`, `users_by_wallet` (lowercase address → id),
//!   `users_by_clerk` (Clerk id → id)
//! - `siwe_nonces`: nonce → expiry (unix seconds, big-endian)

use std::path::Path;

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const PAYMENT_LINKS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("payment_links");
pub(crate) const PAYMENT_LINK_SLUGS: TableDefinition<&str, &str> =
    TableDefinition::new("payment_link_slugs");
pub(crate) const PAYMENT_LINKS_BY_SELLER: TableDefinition<&[u8], &str> =
    TableDefinition::new("payment_links_by_seller");

pub(crate) const PAYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");
pub(crate) const PAYMENTS_BY_SELLER: TableDefinition<&[u8], &str> =
    TableDefinition::new("payments_by_seller");
pub(crate) const PAYMENTS_BY_LINK: TableDefinition<&[u8], &str> =
    TableDefinition::new("payments_by_link");
pub(crate) const PAYMENTS_BY_INTENT: TableDefinition<&str, &str> =
    TableDefinition::new("payments_by_intent");
/// Lower-cased transaction hash -> payment id; one settlement per transaction.
pub(crate) const PAYMENTS_BY_TX_HASH: TableDefinition<&str, &str> =
    TableDefinition::new("payments_by_tx_hash");

pub(crate) const PRODUCTS: TableDefinition<&str, &[u8]> = TableDefinition::new("products");
pub(crate) const PRODUCTS_BY_SELLER: TableDefinition<&[u8], &str> =
    TableDefinition::new("products_by_seller");

pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
pub(crate) const USERS_BY_WALLET: TableDefinition<&str, &str> =
    TableDefinition::new("users_by_wallet");
pub(crate) const USERS_BY_CLERK: TableDefinition<&str, &str> =
    TableDefinition::new("users_by_clerk");

pub(crate) const SIWE_NONCES: TableDefinition<&str, &[u8]> = TableDefinition::new("siwe_nonces");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for an owner index table.
///
/// Format: `owner_len_u32_be | owner | inverted_timestamp_be_bytes | id`
///
/// The length prefix keeps one owner's keys from sharing a prefix with a
/// longer owner name. The inverted timestamp gives newest-first ordering.
pub(crate) fn make_index_key(owner: &str, timestamp_millis: i64, id: &str) -> Vec<u8> {
    let mut key = make_prefix(owner);
    key.reserve(8 + id.len());
    key.extend_from_slice(&(!(timestamp_millis as u64)).to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

fn make_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + owner.len());
    prefix.extend_from_slice(&(owner.len() as u32).to_be_bytes());
    prefix.extend_from_slice(owner.as_bytes());
    prefix
}

// =============================================================================
// Store
// =============================================================================

/// Embedded ACID document database.
pub struct Store {
    db: Database,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PAYMENT_LINKS)?;
            let _ = write_txn.open_table(PAYMENT_LINK_SLUGS)?;
            let _ = write_txn.open_table(PAYMENT_LINKS_BY_SELLER)?;
            let _ = write_txn.open_table(PAYMENTS)?;
            let _ = write_txn.open_table(PAYMENTS_BY_SELLER)?;
            let _ = write_txn.open_table(PAYMENTS_BY_LINK)?;
            let _ = write_txn.open_table(PAYMENTS_BY_INTENT)?;
            let _ = write_txn.open_table(PAYMENTS_BY_TX_HASH)?;
            let _ = write_txn.open_table(PRODUCTS)?;
            let _ = write_txn.open_table(PRODUCTS_BY_SELLER)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_WALLET)?;
            let _ = write_txn.open_table(USERS_BY_CLERK)?;
            let _ = write_txn.open_table(SIWE_NONCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run `f` inside a write transaction and commit it.
    ///
    /// Nothing is committed if `f` returns an error.
    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let write_txn = self.db.begin_write()?;
        let result = f(&write_txn)?;
        write_txn.commit()?;
        Ok(result)
    }

    /// Load a JSON document from a primary table.
    pub(crate) fn get_document<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        id: &str,
    ) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Resolve a unique key through a `key → id` index table.
    pub(crate) fn lookup(
        &self,
        index: TableDefinition<&str, &str>,
        key: &str,
    ) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(index)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Load every document referenced by an owner index, newest first.
    pub(crate) fn list_by_owner<T: DeserializeOwned>(
        &self,
        index: TableDefinition<&[u8], &str>,
        table: TableDefinition<&str, &[u8]>,
        owner: &str,
    ) -> StoreResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(index)?;
        let doc_table = read_txn.open_table(table)?;

        let prefix = make_prefix(owner);

        let mut results = Vec::new();
        for entry in idx_table.range(prefix.as_slice()..)? {
            let (key, id) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            if let Some(value) = doc_table.get(id.value())? {
                results.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(results)
    }

    /// Check that the database answers a read transaction.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(PAYMENTS)?;
        Ok(())
    }
}

/// Serialize and insert a document inside an open write transaction.
pub(crate) fn put_document<T: Serialize>(
    txn: &WriteTransaction,
    table: TableDefinition<&str, &[u8]>,
    id: &str,
    doc: &T,
) -> StoreResult<()> {
    let json = serde_json::to_vec(doc)?;
    let mut table = txn.open_table(table)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

/// Load a document inside an open write transaction.
pub(crate) fn load_document<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: TableDefinition<&str, &[u8]>,
    id: &str,
) -> StoreResult<Option<T>> {
    let table = txn.open_table(table)?;
    let bytes = match table.get(id)? {
        Some(value) => value.value().to_vec(),
        None => return Ok(None),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn temp_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn make_index_key_ordering() {
        // Newer timestamps should produce smaller composite keys (descending)
        let key_old = make_index_key("seller", 1000, "a");
        let key_new = make_index_key("seller", 2000, "b");
        assert!(key_new < key_old, "Newer timestamps should sort first");
    }

    #[test]
    fn owner_prefix_excludes_longer_owner_names() {
        let key = make_index_key("seller-10", 1000, "x");
        assert!(key.starts_with(&make_prefix("seller-10")));
        assert!(!key.starts_with(&make_prefix("seller-1")));

        let key = make_index_key("acme|evil", 1000, "x");
        assert!(!key.starts_with(&make_prefix("acme")));
    }

    #[test]
    fn list_by_owner_matches_exact_owner_only() {
        let (store, _dir) = temp_store();
        store
            .write(|txn| {
                for (owner, id) in [("acme", "p1"), ("acme|evil", "p2"), ("acme2", "p3")] {
                    put_document(txn, PRODUCTS, id, &serde_json::json!({ "id": id }))?;
                    let mut index = txn.open_table(PRODUCTS_BY_SELLER)?;
                    index.insert(make_index_key(owner, 1000, id).as_slice(), id)?;
                }
                Ok(())
            })
            .unwrap();

        let docs: Vec<serde_json::Value> =
            store.list_by_owner(PRODUCTS_BY_SELLER, PRODUCTS, "acme").unwrap();
        assert_eq!(docs, vec![serde_json::json!({ "id": "p1" })]);
    }

    #[test]
    fn write_rolls_back_on_error() {
        let (store, _dir) = temp_store();

        let result: StoreResult<()> = store.write(|txn| {
            put_document(txn, PRODUCTS, "p1", &serde_json::json!({"name": "x"}))?;
            Err(StoreError::InvalidState("abort".to_string()))
        });
        assert!(result.is_err());

        let doc: Option<serde_json::Value> = store.get_document(PRODUCTS, "p1").unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn ping_succeeds_on_fresh_database() {
        let (store, _dir) = temp_store();
        store.ping().unwrap();
    }
}
