// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{non_blank, normalize_address},
    state::AppState,
    storage::{Store, User, UserProfile, UserRepository},
};

/// Find a user by id, Clerk id or wallet address, in that order.
///
/// 400 when no key is supplied, 404 when nothing matches.
pub(crate) fn resolve_user(
    store: &Store,
    user_id: Option<String>,
    clerk_id: Option<String>,
    wallet_address: Option<String>,
) -> Result<User, ApiError> {
    let repo = UserRepository::new(store);
    let user = if let Some(id) = non_blank(user_id) {
        repo.get(&id)?
    } else if let Some(clerk_id) = non_blank(clerk_id) {
        repo.get_by_clerk(&clerk_id)?
    } else if let Some(address) = non_blank(wallet_address) {
        repo.get_by_wallet(&address)?
    } else {
        return Err(ApiError::bad_request(
            "userId, clerkId or walletAddress is required",
        ));
    };
    user.ok_or_else(|| ApiError::not_found("User not found"))
}

/// Request for POST /api/users/connect
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectUserRequest {
    pub wallet_address: Option<String>,
    pub clerk_id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectUserResponse {
    pub success: bool,
    pub user: User,
    /// Whether the user was created by this call
    pub created: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

/// Find or create the user behind a connected wallet.
#[utoipa::path(
    post,
    path = "/api/users/connect",
    tag = "Users",
    request_body = ConnectUserRequest,
    responses(
        (status = 200, description = "User found or created", body = ConnectUserResponse),
        (status = 400, description = "Missing or malformed wallet address"),
        (status = 409, description = "Clerk id linked to another user")
    )
)]
pub async fn connect_user(
    State(state): State<AppState>,
    payload: Result<Json<ConnectUserRequest>, JsonRejection>,
) -> Result<Json<ConnectUserResponse>, ApiError> {
    let Json(request) = payload?;
    let wallet = non_blank(request.wallet_address)
        .ok_or_else(|| ApiError::bad_request("walletAddress is required"))?;
    let wallet = normalize_address(&wallet).map_err(ApiError::bad_request)?;

    let (user, created) = UserRepository::new(&state.store).find_or_create(
        &wallet,
        UserProfile {
            clerk_id: non_blank(request.clerk_id),
            email: non_blank(request.email),
            username: non_blank(request.username),
        },
    )?;
    if created {
        info!(user_id = %user.id, "User created on wallet connect");
    }

    Ok(Json(ConnectUserResponse {
        success: true,
        user,
        created,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(&state.store)
        .get(&id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}
