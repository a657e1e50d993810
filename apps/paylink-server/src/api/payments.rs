// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment intent creation and payment status lookup.

use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    models::{non_blank, normalize_currency, to_minor_units, validate_positive_amount},
    providers::CreatePaymentIntent,
    state::AppState,
    storage::{
        NewPayment, Payment, PaymentLinkRepository, PaymentRepository, Product, ProductRepository,
    },
};

/// Request body for creating a Stripe payment intent.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Amount in major units
    pub amount: f64,
    /// 3-letter currency code
    pub currency: String,
    /// Slug of the payment link being paid
    pub payment_link: Option<String>,
    pub product_id: Option<String>,
    /// Seller to credit when neither link nor product identifies one
    pub seller_id: Option<String>,
    pub buyer_email: Option<String>,
    pub buyer_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub success: bool,
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    pub payment_id: String,
}

/// Create a Stripe payment intent and record a pending payment.
#[utoipa::path(
    post,
    path = "/api/payments/create-intent",
    tag = "Payments",
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = CreateIntentResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Payment link or product not found"),
        (status = 500, description = "Stripe or storage failure")
    )
)]
pub async fn create_intent(
    State(state): State<AppState>,
    payload: Result<Json<CreateIntentRequest>, JsonRejection>,
) -> Result<Json<CreateIntentResponse>, ApiError> {
    let Json(request) = payload?;

    validate_positive_amount(request.amount).map_err(ApiError::bad_request)?;
    let currency = normalize_currency(&request.currency).map_err(ApiError::bad_request)?;

    let link = match non_blank(request.payment_link) {
        Some(slug) => Some(
            PaymentLinkRepository::new(&state.store)
                .get_by_slug(&slug)?
                .ok_or_else(|| ApiError::not_found("Payment link not found"))?,
        ),
        None => None,
    };
    let product = match non_blank(request.product_id) {
        Some(id) => Some(
            ProductRepository::new(&state.store)
                .get(&id)?
                .ok_or_else(|| ApiError::not_found("Product not found"))?,
        ),
        None => None,
    };
    let seller_id = link
        .as_ref()
        .map(|l| l.seller_id.clone())
        .or_else(|| product.as_ref().map(|p| p.seller_id.clone()))
        .or_else(|| non_blank(request.seller_id))
        .ok_or_else(|| {
            ApiError::bad_request("sellerId is required when no payment link or product is given")
        })?;
    let buyer_email = non_blank(request.buyer_email);

    let mut metadata = BTreeMap::from([("sellerId".to_string(), seller_id.clone())]);
    if let Some(link) = &link {
        metadata.insert("paymentLinkSlug".to_string(), link.slug.clone());
    }
    if let Some(product) = &product {
        metadata.insert("productId".to_string(), product.id.clone());
    }

    let intent = state
        .payments
        .create_payment_intent(CreatePaymentIntent {
            amount_minor: to_minor_units(request.amount),
            currency: currency.clone(),
            metadata,
            description: link
                .as_ref()
                .map(|l| l.name.clone())
                .or_else(|| product.as_ref().map(|p| p.name.clone())),
            receipt_email: buyer_email.clone(),
            idempotency_key: None,
        })
        .await?;

    let payment = Payment::new_pending(NewPayment {
        seller_id,
        payment_link: link.map(|l| l.slug),
        product_id: product.map(|p| p.id),
        amount_usd: request.amount,
        currency,
        stripe_payment_intent_id: Some(intent.id.clone()),
        buyer_email,
        buyer_name: non_blank(request.buyer_name),
    });
    PaymentRepository::new(&state.store).create(&payment)?;

    info!(
        payment_id = %payment.id,
        payment_intent = %intent.id,
        amount_usd = payment.amount_usd,
        "Payment intent created"
    );

    Ok(Json(CreateIntentResponse {
        success: true,
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        payment_id: payment.id,
    }))
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaymentStatusQuery {
    pub payment_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    /// Payment link slug; the most recent payment through it is returned
    pub payment_link: Option<String>,
}

/// Payment joined with its product, if any.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub payment: PaymentView,
}

/// Look up a payment by id, Stripe intent id or payment link slug.
///
/// Keys are tried in that order; a lower key is only consulted when no
/// higher key was supplied or it matched nothing.
#[utoipa::path(
    get,
    path = "/api/payments/status",
    tag = "Payments",
    params(PaymentStatusQuery),
    responses(
        (status = 200, description = "Payment found", body = PaymentStatusResponse),
        (status = 400, description = "No lookup key supplied"),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn payment_status(
    State(state): State<AppState>,
    query: Result<Query<PaymentStatusQuery>, QueryRejection>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let Query(query) = query?;
    let payment_id = non_blank(query.payment_id);
    let intent_id = non_blank(query.stripe_payment_intent_id);
    let slug = non_blank(query.payment_link);

    if payment_id.is_none() && intent_id.is_none() && slug.is_none() {
        return Err(ApiError::bad_request(
            "One of paymentId, stripePaymentIntentId or paymentLink is required",
        ));
    }

    let repo = PaymentRepository::new(&state.store);
    let mut payment = None;
    if let Some(id) = &payment_id {
        payment = repo.get(id)?;
    }
    if payment.is_none() {
        if let Some(intent_id) = &intent_id {
            payment = repo.get_by_intent(intent_id)?;
        }
    }
    if payment.is_none() {
        if let Some(slug) = &slug {
            payment = repo.latest_for_link(slug)?;
        }
    }
    let payment = payment.ok_or_else(|| ApiError::not_found("Payment not found"))?;

    let product = match &payment.product_id {
        Some(id) => ProductRepository::new(&state.store).get(id)?,
        None => None,
    };

    Ok(Json(PaymentStatusResponse {
        success: true,
        payment: PaymentView { payment, product },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        providers::{MockPaymentProcessor, PaymentIntent},
        state::tests::{state_with, test_state, Mocks},
        storage::{
            repository::{
                payment_links::tests::sample_link, payments::tests::sample_payment,
                products::tests::sample_product,
            },
            PaymentStatus,
        },
    };
    use axum::http::StatusCode;

    fn intent_mock() -> MockPaymentProcessor {
        let mut payments = MockPaymentProcessor::new();
        payments
            .expect_create_payment_intent()
            .times(1)
            .returning(|req| {
                Ok(PaymentIntent {
                    id: "pi_abc".to_string(),
                    client_secret: Some("pi_abc_secret".to_string()),
                    status: "requires_payment_method".to_string(),
                    amount: req.amount_minor,
                    currency: req.currency,
                })
            });
        payments
    }

    #[tokio::test]
    async fn rejects_invalid_amount_and_currency() {
        let (state, _dir) = test_state();
        for (amount, currency) in [
            (0.0, "usd"),
            (-1.0, "usd"),
            (0.001, "usd"),
            (f64::NAN, "usd"),
            (5.0, "dollars"),
        ] {
            let err = create_intent(
                State(state.clone()),
                Ok(Json(CreateIntentRequest {
                    amount,
                    currency: currency.to_string(),
                    seller_id: Some("seller-1".to_string()),
                    ..Default::default()
                })),
            )
            .await
            .unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn recorded_usd_amount_matches_charged_cents() {
        let mut payments = MockPaymentProcessor::new();
        payments
            .expect_create_payment_intent()
            .withf(|req| req.amount_minor == 2000)
            .times(1)
            .returning(|req| {
                Ok(PaymentIntent {
                    id: "pi_cents".to_string(),
                    client_secret: None,
                    status: "requires_payment_method".to_string(),
                    amount: req.amount_minor,
                    currency: req.currency,
                })
            });
        let (state, _dir) = state_with(Mocks {
            payments,
            ..Default::default()
        });

        let Json(body) = create_intent(
            State(state.clone()),
            Ok(Json(CreateIntentRequest {
                amount: 19.999,
                currency: "usd".to_string(),
                seller_id: Some("seller-1".to_string()),
                ..Default::default()
            })),
        )
        .await
        .unwrap();

        let payment = PaymentRepository::new(&state.store)
            .get(&body.payment_id)
            .unwrap()
            .unwrap();
        assert_eq!(payment.amount_usd, 20.0);
        assert_eq!(payment.amount_usdc, "20000000");
    }

    #[tokio::test]
    async fn unknown_payment_link_is_not_found() {
        let (state, _dir) = test_state();
        let err = create_intent(
            State(state),
            Ok(Json(CreateIntentRequest {
                amount: 5.0,
                currency: "usd".to_string(),
                payment_link: Some("missing".to_string()),
                ..Default::default()
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn records_pending_payment_for_link() {
        let (state, _dir) = state_with(Mocks {
            payments: intent_mock(),
            ..Default::default()
        });
        PaymentLinkRepository::new(&state.store)
            .create(&sample_link("shop", "seller-9"))
            .unwrap();

        let Json(body) = create_intent(
            State(state.clone()),
            Ok(Json(CreateIntentRequest {
                amount: 49.99,
                currency: "USD".to_string(),
                payment_link: Some("shop".to_string()),
                buyer_email: Some("buyer@example.com".to_string()),
                ..Default::default()
            })),
        )
        .await
        .unwrap();

        assert!(body.success);
        assert_eq!(body.payment_intent_id, "pi_abc");
        assert_eq!(body.client_secret.as_deref(), Some("pi_abc_secret"));

        let payment = PaymentRepository::new(&state.store)
            .get_by_intent("pi_abc")
            .unwrap()
            .unwrap();
        assert_eq!(payment.id, body.payment_id);
        assert_eq!(payment.seller_id, "seller-9");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount_usdc, "49990000");
        assert_eq!(payment.payment_link.as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn status_requires_a_key() {
        let (state, _dir) = test_state();
        let err = payment_status(State(state), Ok(Query(PaymentStatusQuery::default())))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn payment_id_takes_priority_over_link() {
        let (state, _dir) = test_state();
        let repo = PaymentRepository::new(&state.store);
        let first = sample_payment("seller-1", 10.0);
        repo.create(&first).unwrap();
        let mut second = sample_payment("seller-1", 20.0);
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        repo.create(&second).unwrap();

        let Json(body) = payment_status(
            State(state.clone()),
            Ok(Query(PaymentStatusQuery {
                payment_id: Some(first.id.clone()),
                payment_link: Some("link-1".to_string()),
                ..Default::default()
            })),
        )
        .await
        .unwrap();
        assert_eq!(body.payment.payment.id, first.id);

        let Json(by_link) = payment_status(
            State(state),
            Ok(Query(PaymentStatusQuery {
                payment_link: Some("link-1".to_string()),
                ..Default::default()
            })),
        )
        .await
        .unwrap();
        assert_eq!(by_link.payment.payment.id, second.id);
    }

    #[tokio::test]
    async fn status_joins_product() {
        let (state, _dir) = test_state();
        let product = sample_product("seller-1", true);
        ProductRepository::new(&state.store).create(&product).unwrap();
        let mut payment = sample_payment("seller-1", 12.0);
        payment.product_id = Some(product.id.clone());
        PaymentRepository::new(&state.store).create(&payment).unwrap();

        let Json(body) = payment_status(
            State(state),
            Ok(Query(PaymentStatusQuery {
                stripe_payment_intent_id: payment.stripe_payment_intent_id.clone(),
                ..Default::default()
            })),
        )
        .await
        .unwrap();
        assert_eq!(body.payment.product, Some(product));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["payment"]["amountUSD"], 12.0);
        assert_eq!(json["payment"]["product"]["name"], "Sticker pack");
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let (state, _dir) = test_state();
        let err = payment_status(
            State(state),
            Ok(Query(PaymentStatusQuery {
                payment_id: Some("nope".to_string()),
                ..Default::default()
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
