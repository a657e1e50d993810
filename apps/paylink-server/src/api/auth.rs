// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-In With Ethereum endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    auth::{generate_nonce, issue_session_token, Auth, AuthError, AuthenticatedSession, SiweMessage},
    error::ApiError,
    state::AppState,
    storage::{NonceRepository, StoreError, UserProfile, UserRepository},
};

/// Lifetime of an issued nonce.
const NONCE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySiweRequest {
    /// EIP-4361 message text
    pub message: Option<String>,
    /// 65-byte personal-sign signature, hex
    pub signature: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    /// HS256 session token, present only on sign-in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub session: AuthenticatedSession,
}

fn internal(e: StoreError) -> AuthError {
    AuthError::InternalError(e.to_string())
}

/// Issue a single-use SIWE nonce.
#[utoipa::path(
    get,
    path = "/api/auth/nonce",
    tag = "Auth",
    responses(
        (status = 200, description = "Fresh nonce", body = NonceResponse),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn get_nonce(State(state): State<AppState>) -> Result<Json<NonceResponse>, ApiError> {
    let nonce = generate_nonce();
    let expires_at = Utc::now() + Duration::minutes(NONCE_TTL_MINUTES);
    NonceRepository::new(&state.store).issue(&nonce, expires_at)?;
    Ok(Json(NonceResponse { nonce, expires_at }))
}

/// Verify a signed SIWE message and start a session.
#[utoipa::path(
    post,
    path = "/api/auth/verify",
    tag = "Auth",
    request_body = VerifySiweRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Malformed message or signature"),
        (status = 401, description = "Nonce, domain, chain or signer rejected"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn verify_siwe(
    State(state): State<AppState>,
    payload: Result<Json<VerifySiweRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AuthError> {
    let Json(request) = payload.map_err(|e| AuthError::InvalidMessage(e.body_text()))?;
    let (Some(message), Some(signature)) = (request.message, request.signature) else {
        return Err(AuthError::InvalidMessage(
            "message and signature are required".to_string(),
        ));
    };

    let now = Utc::now();
    let siwe: SiweMessage = message.parse()?;
    siwe.validate(
        &state.config.auth.siwe_domain,
        state.config.chain.network.chain_id,
        now,
    )?;

    let signer = state
        .signatures
        .verify(&siwe, &signature)
        .inspect_err(|e| {
            if *e == AuthError::SignerMismatch {
                warn!(claimed = %siwe.address(), "SIWE signer mismatch");
            }
        })?;

    NonceRepository::new(&state.store)
        .consume(siwe.nonce(), now)
        .map_err(|e| match e {
            StoreError::NotFound(_) | StoreError::InvalidState(_) => AuthError::InvalidNonce,
            other => internal(other),
        })?;

    let (user, created) = UserRepository::new(&state.store)
        .find_or_create(&signer, UserProfile::default())
        .map_err(internal)?;

    let (token, session) = issue_session_token(
        &user.id,
        &signer,
        siwe.chain_id(),
        now,
        state.config.auth.session_ttl_secs,
        &state.config.auth.session_secret,
    )?;

    info!(user_id = %user.id, address = %signer, created, "SIWE sign-in");

    Ok(Json(SessionResponse {
        success: true,
        token: Some(token),
        session,
    }))
}

/// Return the session behind the bearer token.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn get_session(Auth(session): Auth) -> Json<SessionResponse> {
    Json(SessionResponse {
        success: true,
        token: None,
        session,
    })
}
