// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-seller dashboard summary.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    models::{format_usd, non_blank},
    state::AppState,
    storage::{Payment, PaymentRepository, ProductRepository},
};

/// Number of payments listed under `recentPayments`.
const RECENT_PAYMENTS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    pub seller_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellerAnalytics {
    /// Sum of completed payments in USD
    #[serde(rename = "totalEarningsUSD")]
    pub total_earnings_usd: f64,
    /// Sum of completed payments in USDC base units, integer string
    #[serde(rename = "totalEarningsUSDC")]
    pub total_earnings_usdc: String,
    /// Completed payment count
    pub total_payments: u64,
    pub total_products: u64,
    pub active_products: u64,
    /// Five most recent payments, any status
    pub recent_payments: Vec<Payment>,
    /// `totalEarningsUSD / totalPayments` with two decimals
    pub average_order_value: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub analytics: SellerAnalytics,
}

/// Average order value with two decimals, `"0.00"` without payments.
pub(crate) fn average_order_value(total_usd: f64, count: u64) -> String {
    if count == 0 {
        return format_usd(0.0);
    }
    format_usd(total_usd / count as f64)
}

#[utoipa::path(
    get,
    path = "/api/analytics",
    tag = "Analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Seller analytics", body = AnalyticsResponse),
        (status = 400, description = "sellerId missing"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn seller_analytics(
    State(state): State<AppState>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let Query(query) = query?;
    let seller_id =
        non_blank(query.seller_id).ok_or_else(|| ApiError::bad_request("sellerId is required"))?;

    let payments = PaymentRepository::new(&state.store);
    let earnings = payments.earnings_summary(&seller_id)?;
    let recent_payments = payments.recent_by_seller(&seller_id, RECENT_PAYMENTS)?;
    let products = ProductRepository::new(&state.store).counts(&seller_id)?;

    Ok(Json(AnalyticsResponse {
        success: true,
        analytics: SellerAnalytics {
            total_earnings_usd: earnings.total_usd,
            total_earnings_usdc: earnings.total_usdc.to_string(),
            total_payments: earnings.count,
            total_products: products.total,
            active_products: products.active,
            recent_payments,
            average_order_value: average_order_value(earnings.total_usd, earnings.count),
        },
    }))
}
