// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the authenticated session representation.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claims carried by a session token (HS256).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id
    pub sub: String,
    /// Lower-cased wallet address that signed in
    pub address: String,
    pub chain_id: u64,
    pub iat: i64,
    pub exp: i64,
}

/// Session information extracted from a valid token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedSession {
    pub user_id: String,
    pub address: String,
    pub chain_id: u64,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedSession {
    pub fn from_claims(claims: SessionClaims) -> Self {
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            user_id: claims.sub,
            address: claims.address,
            chain_id: claims.chain_id,
            expires_at,
        }
    }
}

/// Sign a session token for a user.
pub fn issue_session_token(
    user_id: &str,
    address: &str,
    chain_id: u64,
    now: DateTime<Utc>,
    ttl_secs: i64,
    secret: &str,
) -> Result<(String, AuthenticatedSession), AuthError> {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        address: address.to_ascii_lowercase(),
        chain_id,
        iat: now.timestamp(),
        exp: now.timestamp() + ttl_secs,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InternalError(format!("failed to sign session: {e}")))?;
    Ok((token, AuthenticatedSession::from_claims(claims)))
}

/// Verify a session token's signature and expiry.
pub fn verify_session_token(token: &str, secret: &str) -> Result<AuthenticatedSession, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::MalformedToken,
    })?;

    Ok(AuthenticatedSession::from_claims(token_data.claims))
}
