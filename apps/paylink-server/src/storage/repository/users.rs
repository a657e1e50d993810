// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Users are keyed by a UUID and indexed by their lower-cased wallet address
//! and, when linked, by their Clerk id. Both indexes are unique.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    load_document, put_document, Store, StoreError, StoreResult, USERS, USERS_BY_CLERK,
    USERS_BY_WALLET,
};

/// Stored user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Connected wallet, lower-cased
    pub wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub onboarded: bool,
    /// Blockradar address id of the custodial wallet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custodial_wallet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custodial_wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Custodial wallet id and address, if both are configured.
    pub fn custodial_wallet(&self) -> Option<(&str, &str)> {
        match (&self.custodial_wallet_id, &self.custodial_wallet_address) {
            (Some(id), Some(address)) => Some((id.as_str(), address.as_str())),
            _ => None,
        }
    }
}

/// Optional profile fields attached on connect.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub clerk_id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
}

pub struct UserRepository<'a> {
    store: &'a Store,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<User>> {
        self.store.get_document(USERS, id)
    }

    /// Look up by wallet address (any case).
    pub fn get_by_wallet(&self, address: &str) -> StoreResult<Option<User>> {
        match self
            .store
            .lookup(USERS_BY_WALLET, &address.to_ascii_lowercase())?
        {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    pub fn get_by_clerk(&self, clerk_id: &str) -> StoreResult<Option<User>> {
        match self.store.lookup(USERS_BY_CLERK, clerk_id)? {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Find the user for a wallet, creating one if needed.
    ///
    /// Missing profile fields are filled on an existing user; present ones
    /// are left alone. Returns the user and whether it was created.
    pub fn find_or_create(&self, wallet_address: &str, profile: UserProfile) -> StoreResult<(User, bool)> {
        let wallet = wallet_address.to_ascii_lowercase();

        self.store.write(|txn| {
            let existing_id = {
                let by_wallet = txn.open_table(USERS_BY_WALLET)?;
                let id = by_wallet.get(wallet.as_str())?.map(|v| v.value().to_string());
                id
            };

            let (mut user, created) = match existing_id {
                Some(id) => {
                    let user: User = load_document(txn, USERS, &id)?
                        .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;
                    (user, false)
                }
                None => {
                    let now = Utc::now();
                    let user = User {
                        id: uuid::Uuid::new_v4().to_string(),
                        wallet_address: wallet.clone(),
                        clerk_id: None,
                        email: None,
                        username: None,
                        onboarded: false,
                        custodial_wallet_id: None,
                        custodial_wallet_address: None,
                        created_at: now,
                        updated_at: now,
                    };
                    let mut by_wallet = txn.open_table(USERS_BY_WALLET)?;
                    by_wallet.insert(wallet.as_str(), user.id.as_str())?;
                    (user, true)
                }
            };

            let mut changed = created;
            if user.clerk_id.is_none() {
                if let Some(clerk_id) = profile.clerk_id {
                    let mut by_clerk = txn.open_table(USERS_BY_CLERK)?;
                    let taken = by_clerk.get(clerk_id.as_str())?.is_some();
                    if taken {
                        return Err(StoreError::AlreadyExists(format!(
                            "Clerk id {clerk_id} is linked to another user"
                        )));
                    }
                    by_clerk.insert(clerk_id.as_str(), user.id.as_str())?;
                    user.clerk_id = Some(clerk_id);
                    changed = true;
                }
            }
            if user.email.is_none() && profile.email.is_some() {
                user.email = profile.email;
                changed = true;
            }
            if user.username.is_none() && profile.username.is_some() {
                user.username = profile.username;
                changed = true;
            }

            if changed {
                if !created {
                    user.updated_at = Utc::now();
                }
                put_document(txn, USERS, &user.id, &user)?;
            }
            Ok((user, created))
        })
    }

    /// Attach a custodial wallet; fails with `AlreadyExists` if one is set.
    pub fn set_custodial_wallet(&self, user_id: &str, wallet_id: &str, address: &str) -> StoreResult<User> {
        self.store.write(|txn| {
            let mut user: User = load_document(txn, USERS, user_id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))?;
            if user.custodial_wallet_id.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "Custodial wallet for user {user_id}"
                )));
            }
            user.custodial_wallet_id = Some(wallet_id.to_string());
            user.custodial_wallet_address = Some(address.to_ascii_lowercase());
            user.updated_at = Utc::now();
            put_document(txn, USERS, user_id, &user)?;
            Ok(user)
        })
    }
}
