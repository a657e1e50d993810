// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial wallet endpoints.
//!
//! Seller wallets live at Blockradar; the user record stores the address id
//! and address. Balances and transactions are fetched live on each call.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::users::resolve_user;
use crate::{
    error::ApiError,
    models::non_blank,
    providers::AssetBalance,
    state::AppState,
    storage::{User, UserRepository},
};

/// Default number of recent transactions returned with a balance.
const DEFAULT_TRANSACTION_LIMIT: usize = 10;
/// Largest transaction page a caller may request.
const MAX_TRANSACTION_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WalletQuery {
    pub user_id: Option<String>,
    pub clerk_id: Option<String>,
    pub wallet_address: Option<String>,
    /// Recent transactions to include (default 10, at most 50)
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionWalletRequest {
    pub user_id: Option<String>,
}

/// A user's custodial wallet.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustodialWalletView {
    /// Blockradar address id
    pub wallet_id: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balances: Option<Vec<AssetBalance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub transactions: Option<Vec<Value>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletResponse {
    pub success: bool,
    pub wallet: CustodialWalletView,
}

fn custodial_wallet(user: &User) -> Result<(String, String), ApiError> {
    user.custodial_wallet()
        .map(|(id, address)| (id.to_string(), address.to_string()))
        .ok_or_else(|| ApiError::not_found("Custodial wallet not found for user"))
}

/// Get the custodial wallet and balances of a user.
#[utoipa::path(
    get,
    path = "/api/user/wallet",
    tag = "Wallets",
    params(WalletQuery),
    responses(
        (status = 200, description = "Wallet with balances", body = WalletResponse),
        (status = 400, description = "No user key supplied"),
        (status = 404, description = "User or custodial wallet not found"),
        (status = 500, description = "Provider failure")
    )
)]
pub async fn get_user_wallet(
    State(state): State<AppState>,
    query: Result<Query<WalletQuery>, QueryRejection>,
) -> Result<Json<WalletResponse>, ApiError> {
    let Query(query) = query?;
    let user = resolve_user(
        &state.store,
        query.user_id,
        query.clerk_id,
        query.wallet_address,
    )?;
    let (wallet_id, address) = custodial_wallet(&user)?;

    let balances = state.wallets.address_balances(&wallet_id).await?;

    Ok(Json(WalletResponse {
        success: true,
        wallet: CustodialWalletView {
            wallet_id,
            address,
            balances: Some(balances),
            transactions: None,
        },
    }))
}

/// Provision a custodial wallet for a user.
#[utoipa::path(
    post,
    path = "/api/user/wallet",
    tag = "Wallets",
    request_body = ProvisionWalletRequest,
    responses(
        (status = 201, description = "Wallet provisioned", body = WalletResponse),
        (status = 400, description = "userId missing"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User already has a custodial wallet"),
        (status = 500, description = "Provider failure")
    )
)]
pub async fn provision_user_wallet(
    State(state): State<AppState>,
    payload: Result<Json<ProvisionWalletRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WalletResponse>), ApiError> {
    let Json(request) = payload?;
    let user_id =
        non_blank(request.user_id).ok_or_else(|| ApiError::bad_request("userId is required"))?;

    let users = UserRepository::new(&state.store);
    let user = users
        .get(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if user.custodial_wallet_id.is_some() {
        return Err(ApiError::conflict("User already has a custodial wallet"));
    }

    let created = state
        .wallets
        .create_address(&format!("paylink-{}", user.id))
        .await?;
    let user = users.set_custodial_wallet(&user.id, &created.id, &created.address)?;
    let (wallet_id, address) = custodial_wallet(&user)?;

    info!(user_id = %user.id, wallet_id = %wallet_id, "Custodial wallet provisioned");

    Ok((
        StatusCode::CREATED,
        Json(WalletResponse {
            success: true,
            wallet: CustodialWalletView {
                wallet_id,
                address,
                balances: None,
                transactions: None,
            },
        }),
    ))
}

/// Balances plus recent transactions of a user's custodial wallet.
#[utoipa::path(
    get,
    path = "/api/wallets/balance",
    tag = "Wallets",
    params(WalletQuery),
    responses(
        (status = 200, description = "Balances and recent transactions", body = WalletResponse),
        (status = 400, description = "No user key supplied"),
        (status = 404, description = "User or custodial wallet not found"),
        (status = 500, description = "Provider failure")
    )
)]
pub async fn wallet_balance(
    State(state): State<AppState>,
    query: Result<Query<WalletQuery>, QueryRejection>,
) -> Result<Json<WalletResponse>, ApiError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
        .clamp(1, MAX_TRANSACTION_LIMIT);
    let user = resolve_user(
        &state.store,
        query.user_id,
        query.clerk_id,
        query.wallet_address,
    )?;
    let (wallet_id, address) = custodial_wallet(&user)?;

    let balances = state.wallets.address_balances(&wallet_id).await?;
    let transactions = state.wallets.address_transactions(&wallet_id, limit).await?;

    Ok(Json(WalletResponse {
        success: true,
        wallet: CustodialWalletView {
            wallet_id,
            address,
            balances: Some(balances),
            transactions: Some(transactions),
        },
    }))
}
