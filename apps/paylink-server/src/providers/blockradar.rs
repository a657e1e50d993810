// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockradar custodial wallet integration.
//!
//! Seller wallets are addresses under one Blockradar master wallet
//! (`BLOCKRADAR_WALLET_ID`). Users store the address id and address.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use utoipa::ToSchema;

use crate::config::BlockradarConfig;

#[derive(Debug, thiserror::Error)]
pub enum BlockradarError {
    #[error("Blockradar configuration missing: {0}")]
    MissingConfig(String),

    #[error("Blockradar request failed: {0}")]
    Request(String),

    #[error("{0}")]
    Api(String),

    #[error("Blockradar response was invalid: {0}")]
    InvalidResponse(String),
}

/// Balance of one asset held by a custodial address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub symbol: String,
    pub name: String,
    /// Balance in major units, as returned by the provider
    pub balance: String,
    /// Fiat value of the balance, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_balance: Option<String>,
}

/// A newly provisioned custodial address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodialAddress {
    pub id: String,
    pub address: String,
}

/// Custodial wallet provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustodialWallets: Send + Sync {
    async fn address_balances(&self, address_id: &str) -> Result<Vec<AssetBalance>, BlockradarError>;

    /// Most recent transactions of an address, at most `limit`.
    async fn address_transactions(
        &self,
        address_id: &str,
        limit: usize,
    ) -> Result<Vec<Value>, BlockradarError>;

    /// A single master-wallet transaction, as returned by the provider.
    async fn transaction(&self, transaction_id: &str) -> Result<Value, BlockradarError>;

    async fn create_address(&self, label: &str) -> Result<CustodialAddress, BlockradarError>;
}

/// Blockradar REST client.
#[derive(Debug, Clone)]
pub struct BlockradarClient {
    api_base_url: String,
    api_key: String,
    wallet_id: Option<String>,
    http: Client,
}

impl BlockradarClient {
    pub fn new(config: &BlockradarConfig) -> Result<Self, BlockradarError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| BlockradarError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            wallet_id: config.wallet_id.clone(),
            http,
        })
    }

    fn master_wallet(&self) -> Result<&str, BlockradarError> {
        self.wallet_id
            .as_deref()
            .ok_or_else(|| BlockradarError::MissingConfig("BLOCKRADAR_WALLET_ID".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, BlockradarError> {
        let response = self
            .http
            .get(self.url(path))
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| BlockradarError::Request(format!("GET {path} failed: {e}")))?;
        Self::read_data(response, "GET", path).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, BlockradarError> {
        let response = self
            .http
            .post(self.url(path))
            .header("x-api-key", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| BlockradarError::Request(format!("POST {path} failed: {e}")))?;
        Self::read_data(response, "POST", path).await
    }

    /// Unwrap the `data` member of a Blockradar response.
    async fn read_data(
        response: reqwest::Response,
        method: &str,
        path: &str,
    ) -> Result<Value, BlockradarError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            BlockradarError::Request(format!("{method} {path} body read failed: {e}"))
        })?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(provider_message)
                .unwrap_or_else(|| format!("Blockradar {method} {path} returned {status}: {text}"));
            return Err(BlockradarError::Api(message));
        }

        let body = body.ok_or_else(|| {
            BlockradarError::InvalidResponse(format!("{method} {path} invalid JSON"))
        })?;
        body.get("data").cloned().ok_or_else(|| {
            BlockradarError::InvalidResponse(format!("{method} {path} response has no data"))
        })
    }
}

#[async_trait]
impl CustodialWallets for BlockradarClient {
    async fn address_balances(&self, address_id: &str) -> Result<Vec<AssetBalance>, BlockradarError> {
        let master = self.master_wallet()?;
        let data = self
            .get_json(&format!("/wallets/{master}/addresses/{address_id}/balances"))
            .await?;
        Ok(parse_balances(&data))
    }

    async fn address_transactions(
        &self,
        address_id: &str,
        limit: usize,
    ) -> Result<Vec<Value>, BlockradarError> {
        let master = self.master_wallet()?;
        let data = self
            .get_json(&format!(
                "/wallets/{master}/addresses/{address_id}/transactions?page=1&limit={limit}"
            ))
            .await?;
        let mut transactions = match data {
            Value::Array(items) => items,
            other => other
                .get("transactions")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        };
        transactions.truncate(limit);
        Ok(transactions)
    }

    async fn transaction(&self, transaction_id: &str) -> Result<Value, BlockradarError> {
        let master = self.master_wallet()?;
        self.get_json(&format!("/wallets/{master}/transactions/{transaction_id}"))
            .await
    }

    async fn create_address(&self, label: &str) -> Result<CustodialAddress, BlockradarError> {
        let master = self.master_wallet()?;
        let data = self
            .post_json(
                &format!("/wallets/{master}/addresses"),
                &json!({ "name": label }),
            )
            .await?;
        let address = parse_address(&data)?;
        info!(address_id = %address.id, "Provisioned custodial address");
        Ok(address)
    }
}

fn provider_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_balances(data: &Value) -> Vec<AssetBalance> {
    let items = match data {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    items
        .iter()
        .filter_map(|item| {
            Some(AssetBalance {
                symbol: string_at(item, "/asset/symbol")?,
                name: string_at(item, "/asset/name").unwrap_or_default(),
                balance: string_at(item, "/balance").unwrap_or_else(|| "0".to_string()),
                converted_balance: string_at(item, "/convertedBalance"),
            })
        })
        .collect()
}

fn parse_address(data: &Value) -> Result<CustodialAddress, BlockradarError> {
    let id = string_at(data, "/id")
        .ok_or_else(|| BlockradarError::InvalidResponse("address id missing".to_string()))?;
    let address = string_at(data, "/address")
        .ok_or_else(|| BlockradarError::InvalidResponse("address missing".to_string()))?;
    Ok(CustodialAddress { id, address })
}
