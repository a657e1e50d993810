// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    blockchain::{BlockchainVerificationError, VerifierError},
    providers::{BlockradarError, StripeError},
    storage::StoreError,
};

/// Generic message returned for failures whose cause is only logged.
const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Machine-readable code (on-chain verification failures)
    pub code: Option<String>,
    pub details: Option<Value>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Upstream or unexpected failure whose message is safe to return.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Log `cause` and return a generic 500.
    pub fn internal_logged(context: &str, cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "{context}");
        Self::internal(INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            code: self.code,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::not_found(format!("{what} not found")),
            StoreError::AlreadyExists(what) => Self::conflict(format!("{what} already exists")),
            StoreError::InvalidState(msg) => Self::bad_request(msg),
            other => Self::internal_logged("Storage operation failed", other),
        }
    }
}

impl From<StripeError> for ApiError {
    fn from(e: StripeError) -> Self {
        if let StripeError::InvalidRequest(message) = &e {
            return Self::bad_request(message.clone());
        }
        tracing::error!(error = %e, "Stripe call failed");
        Self::internal(e.to_string())
    }
}

impl From<BlockradarError> for ApiError {
    fn from(e: BlockradarError) -> Self {
        tracing::error!(error = %e, "Blockradar call failed");
        Self::internal(e.to_string())
    }
}

impl From<BlockchainVerificationError> for ApiError {
    fn from(e: BlockchainVerificationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: e.message,
            code: Some(e.code.as_str().to_string()),
            details: Some(e.details),
        }
    }
}

impl From<VerifierError> for ApiError {
    fn from(e: VerifierError) -> Self {
        match e {
            VerifierError::Verification(v) => v.into(),
            other => Self::internal_logged("Payment verification failed", other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::VerificationErrorCode;
    use axum::body::to_bytes;
    use serde_json::json;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let conflict = ApiError::conflict("dup");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[tokio::test]
    async fn verification_errors_carry_code_and_details() {
        let err: ApiError = BlockchainVerificationError::new(
            VerificationErrorCode::TransactionReverted,
            "Transaction reverted",
            json!({ "transactionHash": "0xabc" }),
        )
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let response = err.into_response();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Transaction reverted");
        assert_eq!(body["code"], "TRANSACTION_REVERTED");
        assert_eq!(body["details"]["transactionHash"], "0xabc");
    }

    #[test]
    fn storage_failures_are_generic() {
        let err: ApiError = StoreError::Serde(serde_json::from_str::<Value>("{").unwrap_err()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, INTERNAL_MESSAGE);

        let err: ApiError = StoreError::AlreadyExists("User".to_string()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn provider_messages_pass_through() {
        let err: ApiError = BlockradarError::Api("Address not found".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Address not found");
    }
}
