// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment link repository.
//!
//! Links are addressed by a UUID internally and by a public slug externally.
//! The slug index is unique: a create with a taken slug fails with
//! `AlreadyExists` and nothing is written.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    make_index_key, put_document, Store, StoreError, StoreResult, PAYMENT_LINKS,
    PAYMENT_LINKS_BY_SELLER, PAYMENT_LINK_SLUGS,
};

/// Kind of payment link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentLinkType {
    /// Fixed-price link for a product; amount is mandatory
    Product,
    /// Open link; amount may be chosen at checkout
    #[default]
    General,
}

/// Payment link status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentLinkStatus {
    #[default]
    Active,
    Inactive,
    Expired,
}

/// Stored payment link.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    /// Internal identifier (UUID)
    pub id: String,
    /// Public slug used in the checkout URL
    pub slug: String,
    /// Seller who owns the link
    pub seller_id: String,
    /// Link kind
    #[serde(rename = "type")]
    pub link_type: PaymentLinkType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in major units; required for product links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Lower-case currency code
    pub currency: String,
    /// Public checkout URL, ends with the slug
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_client_secret: Option<String>,
    pub status: PaymentLinkStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional filters for listing a seller's links.
#[derive(Debug, Clone, Default)]
pub struct PaymentLinkFilter {
    pub status: Option<PaymentLinkStatus>,
    pub link_type: Option<PaymentLinkType>,
}

impl PaymentLinkFilter {
    fn matches(&self, link: &PaymentLink) -> bool {
        self.status.map_or(true, |s| s == link.status)
            && self.link_type.map_or(true, |t| t == link.link_type)
    }
}

/// Repository for payment link operations.
pub struct PaymentLinkRepository<'a> {
    store: &'a Store,
}

impl<'a> PaymentLinkRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert a new link and its slug/seller index entries.
    pub fn create(&self, link: &PaymentLink) -> StoreResult<()> {
        self.store.write(|txn| {
            {
                let mut slugs = txn.open_table(PAYMENT_LINK_SLUGS)?;
                let taken = slugs.get(link.slug.as_str())?.is_some();
                if taken {
                    return Err(StoreError::AlreadyExists(format!(
                        "Payment link slug {}",
                        link.slug
                    )));
                }
                slugs.insert(link.slug.as_str(), link.id.as_str())?;

                let mut by_seller = txn.open_table(PAYMENT_LINKS_BY_SELLER)?;
                let key = make_index_key(
                    &link.seller_id,
                    link.created_at.timestamp_millis(),
                    &link.id,
                );
                by_seller.insert(key.as_slice(), link.id.as_str())?;
            }
            put_document(txn, PAYMENT_LINKS, &link.id, link)
        })
    }

    /// Get a link by internal id.
    pub fn get(&self, id: &str) -> StoreResult<Option<PaymentLink>> {
        self.store.get_document(PAYMENT_LINKS, id)
    }

    /// Get a link by public slug.
    pub fn get_by_slug(&self, slug: &str) -> StoreResult<Option<PaymentLink>> {
        match self.store.lookup(PAYMENT_LINK_SLUGS, slug)? {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// List a seller's links, newest first, with optional filters.
    pub fn list_by_seller(
        &self,
        seller_id: &str,
        filter: &PaymentLinkFilter,
    ) -> StoreResult<Vec<PaymentLink>> {
        let links: Vec<PaymentLink> =
            self.store
                .list_by_owner(PAYMENT_LINKS_BY_SELLER, PAYMENT_LINKS, seller_id)?;
        Ok(links.into_iter().filter(|l| filter.matches(l)).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::database::tests::temp_store;
    use chrono::Duration;

    pub(crate) fn sample_link(slug: &str, seller_id: &str) -> PaymentLink {
        let now = Utc::now();
        PaymentLink {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.to_string(),
            seller_id: seller_id.to_string(),
            link_type: PaymentLinkType::Product,
            name: "Course".to_string(),
            description: Some("Rust course".to_string()),
            amount: Some(49.99),
            currency: "usd".to_string(),
            url: format!("http://localhost:3000/pay/{slug}"),
            stripe_payment_intent_id: None,
            stripe_client_secret: None,
            status: PaymentLinkStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_and_get_by_slug() {
        let (store, _dir) = temp_store();
        let repo = PaymentLinkRepository::new(&store);

        let link = sample_link("abc123", "seller-1");
        repo.create(&link).unwrap();

        let loaded = repo.get_by_slug("abc123").unwrap().unwrap();
        assert_eq!(loaded, link);
        assert!(repo.get_by_slug("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_slug_is_rejected() {
        let (store, _dir) = temp_store();
        let repo = PaymentLinkRepository::new(&store);

        repo.create(&sample_link("dup", "seller-1")).unwrap();
        let second = sample_link("dup", "seller-2");
        let result = repo.create(&second);

        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
        // The losing record must not be half-written
        assert!(repo.get(&second.id).unwrap().is_none());
        assert!(repo.list_by_seller("seller-2", &Default::default()).unwrap().is_empty());
    }

    #[test]
    fn list_by_seller_is_newest_first_and_filtered() {
        let (store, _dir) = temp_store();
        let repo = PaymentLinkRepository::new(&store);

        for i in 0..3 {
            let mut link = sample_link(&format!("s{i}"), "seller-1");
            link.created_at = Utc::now() - Duration::seconds(10 - i);
            if i == 1 {
                link.link_type = PaymentLinkType::General;
                link.amount = None;
            }
            repo.create(&link).unwrap();
        }
        repo.create(&sample_link("other", "seller-2")).unwrap();

        let all = repo.list_by_seller("seller-1", &Default::default()).unwrap();
        let slugs: Vec<_> = all.iter().map(|l| l.slug.as_str()).collect();
        assert_eq!(slugs, vec!["s2", "s1", "s0"]);

        let products = repo
            .list_by_seller(
                "seller-1",
                &PaymentLinkFilter {
                    link_type: Some(PaymentLinkType::Product),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(products.len(), 2);

        let inactive = repo
            .list_by_seller(
                "seller-1",
                &PaymentLinkFilter {
                    status: Some(PaymentLinkStatus::Inactive),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(inactive.is_empty());
    }

    #[test]
    fn seller_listing_ignores_sellers_sharing_a_prefix() {
        let (store, _dir) = temp_store();
        let repo = PaymentLinkRepository::new(&store);

        repo.create(&sample_link("own", "acme")).unwrap();
        repo.create(&sample_link("piped", "acme|evil")).unwrap();
        repo.create(&sample_link("longer", "acme-2")).unwrap();

        let links = repo.list_by_seller("acme", &Default::default()).unwrap();
        let slugs: Vec<_> = links.iter().map(|l| l.slug.as_str()).collect();
        assert_eq!(slugs, vec!["own"]);
    }

    #[test]
    fn type_serializes_as_type_field() {
        let link = sample_link("x", "s");
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "product");
        assert_eq!(json["sellerId"], "s");
        assert!(json.get("stripePaymentIntentId").is_none());
    }
}
