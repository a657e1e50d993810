// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type, covering SIWE sign-in and session tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// SIWE message could not be parsed
    InvalidMessage(String),
    /// Nonce unknown, already used, or expired
    InvalidNonce,
    /// SIWE domain differs from the configured domain
    DomainMismatch,
    /// SIWE chain id differs from the settlement chain
    ChainMismatch,
    /// SIWE message expired or not yet valid
    MessageExpired,
    /// Signature does not recover to the message address
    SignerMismatch,
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidMessage(_) => "invalid_message",
            AuthError::InvalidNonce => "invalid_nonce",
            AuthError::DomainMismatch => "domain_mismatch",
            AuthError::ChainMismatch => "chain_mismatch",
            AuthError::MessageExpired => "message_expired",
            AuthError::SignerMismatch => "signer_mismatch",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::InvalidNonce
            | AuthError::DomainMismatch
            | AuthError::ChainMismatch
            | AuthError::MessageExpired
            | AuthError::SignerMismatch => StatusCode::UNAUTHORIZED,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidMessage(msg) => write!(f, "Invalid SIWE message: {msg}"),
            AuthError::InvalidNonce => write!(f, "Nonce is invalid, expired or already used"),
            AuthError::DomainMismatch => write!(f, "SIWE domain does not match"),
            AuthError::ChainMismatch => write!(f, "SIWE chain id does not match"),
            AuthError::MessageExpired => write!(f, "SIWE message is expired or not yet valid"),
            AuthError::SignerMismatch => {
                write!(f, "Signature does not match the message address")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::InternalError(msg) = &self {
            tracing::error!(error = %msg, "Authentication failed internally");
        }
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_auth_returns_401() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[test]
    fn malformed_message_is_a_bad_request() {
        let err = AuthError::InvalidMessage("missing nonce".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid SIWE message: missing nonce");
    }

    #[test]
    fn signer_mismatch_is_unauthorized() {
        assert_eq!(
            AuthError::SignerMismatch.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
