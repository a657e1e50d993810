// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payout status, as tracked by the custodial wallet provider.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::{error::ApiError, models::non_blank, state::AppState};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PayoutStatusQuery {
    /// Blockradar transaction id
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayoutStatusResponse {
    /// Transaction as reported by Blockradar
    #[schema(value_type = Object)]
    pub transaction: Value,
}

#[utoipa::path(
    get,
    path = "/api/payouts/status",
    tag = "Payouts",
    params(PayoutStatusQuery),
    responses(
        (status = 200, description = "Provider transaction", body = PayoutStatusResponse),
        (status = 400, description = "transactionId missing"),
        (status = 500, description = "Provider failure")
    )
)]
pub async fn payout_status(
    State(state): State<AppState>,
    query: Result<Query<PayoutStatusQuery>, QueryRejection>,
) -> Result<Json<PayoutStatusResponse>, ApiError> {
    let Query(query) = query?;
    let transaction_id = non_blank(query.transaction_id)
        .ok_or_else(|| ApiError::bad_request("transactionId is required"))?;

    let transaction = state.wallets.transaction(&transaction_id).await?;
    Ok(Json(PayoutStatusResponse { transaction }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        providers::{BlockradarError, MockCustodialWallets},
        state::tests::{state_with, test_state, Mocks},
    };
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn requires_transaction_id() {
        let (state, _dir) = test_state();
        let err = payout_status(State(state), Ok(Query(PayoutStatusQuery::default())))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn returns_provider_transaction() {
        let mut wallets = MockCustodialWallets::new();
        wallets
            .expect_transaction()
            .withf(|id| id == "tx-1")
            .returning(|_| Ok(json!({ "id": "tx-1", "status": "SUCCESS" })));
        let (state, _dir) = state_with(Mocks {
            wallets,
            ..Default::default()
        });

        let Json(body) = payout_status(
            State(state),
            Ok(Query(PayoutStatusQuery {
                transaction_id: Some("tx-1".to_string()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(body.transaction["status"], "SUCCESS");
    }

    #[tokio::test]
    async fn provider_error_message_is_returned() {
        let mut wallets = MockCustodialWallets::new();
        wallets
            .expect_transaction()
            .returning(|_| Err(BlockradarError::Api("Transaction not found".to_string())));
        let (state, _dir) = state_with(Mocks {
            wallets,
            ..Default::default()
        });

        let err = payout_status(
            State(state),
            Ok(Query(PayoutStatusQuery {
                transaction_id: Some("tx-404".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Transaction not found");
    }
}
