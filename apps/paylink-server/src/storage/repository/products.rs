// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Seller product catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    make_index_key, put_document, Store, StoreResult, PRODUCTS, PRODUCTS_BY_SELLER,
};

/// Stored product.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in USD major units
    pub price: f64,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Total and active product counts for a seller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductCounts {
    pub total: u64,
    pub active: u64,
}

pub struct ProductRepository<'a> {
    store: &'a Store,
}

impl<'a> ProductRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn create(&self, product: &Product) -> StoreResult<()> {
        self.store.write(|txn| {
            {
                let mut by_seller = txn.open_table(PRODUCTS_BY_SELLER)?;
                let key = make_index_key(
                    &product.seller_id,
                    product.created_at.timestamp_millis(),
                    &product.id,
                );
                by_seller.insert(key.as_slice(), product.id.as_str())?;
            }
            put_document(txn, PRODUCTS, &product.id, product)
        })
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Product>> {
        self.store.get_document(PRODUCTS, id)
    }

    /// Seller's products, newest first.
    pub fn list_by_seller(&self, seller_id: &str) -> StoreResult<Vec<Product>> {
        self.store
            .list_by_owner(PRODUCTS_BY_SELLER, PRODUCTS, seller_id)
    }

    pub fn counts(&self, seller_id: &str) -> StoreResult<ProductCounts> {
        let products = self.list_by_seller(seller_id)?;
        Ok(ProductCounts {
            total: products.len() as u64,
            active: products.iter().filter(|p| p.active).count() as u64,
        })
    }
}
