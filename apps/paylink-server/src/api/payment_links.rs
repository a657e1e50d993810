// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment link endpoints: create, list per seller, and the public
//! slug lookup used by checkout pages.

use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    models::{
        non_blank, normalize_currency, paginate, round_to_cents, to_minor_units,
        usd_to_usdc_string, validate_positive_amount, Pagination, DEFAULT_PAGE_LIMIT,
        MAX_PAGE_LIMIT,
    },
    providers::CreatePaymentIntent,
    state::AppState,
    storage::{
        PaymentLink, PaymentLinkFilter, PaymentLinkRepository, PaymentLinkStatus, PaymentLinkType,
    },
};

const DEFAULT_CURRENCY: &str = "usd";
const SLUG_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SLUG_SUFFIX_LEN: usize = 6;
const SLUG_ATTEMPTS: usize = 3;

/// Request body for creating a payment link.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentLinkRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Price in major units; required and positive for product links
    pub amount: Option<f64>,
    /// ISO currency code (default `usd`)
    pub currency: Option<String>,
    /// Owning seller (required)
    pub seller_id: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<PaymentLinkType>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkResponse {
    pub success: bool,
    pub payment_link: PaymentLink,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListPaymentLinksQuery {
    /// Seller whose links to list (required)
    pub seller_id: Option<String>,
    pub status: Option<PaymentLinkStatus>,
    #[serde(rename = "type")]
    pub link_type: Option<PaymentLinkType>,
    /// Items to skip (default 0)
    pub offset: Option<usize>,
    /// Page size (default 10, at most 100)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkListResponse {
    pub success: bool,
    pub payment_links: Vec<PaymentLink>,
    pub pagination: Pagination,
}

/// Denormalized view rendered by the public payment page.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkProduct {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in USD major units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Price in USDC base units, integer string
    #[serde(rename = "priceUSDC", skip_serializing_if = "Option::is_none")]
    pub price_usdc: Option<String>,
    pub currency: String,
    pub seller_id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub link_type: PaymentLinkType,
    pub status: PaymentLinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl From<PaymentLink> for PaymentLinkProduct {
    fn from(link: PaymentLink) -> Self {
        Self {
            id: link.id,
            slug: link.slug,
            name: link.name,
            description: link.description,
            price: link.amount,
            price_usdc: link.amount.map(usd_to_usdc_string),
            currency: link.currency,
            seller_id: link.seller_id,
            url: link.url,
            link_type: link.link_type,
            status: link.status,
            payment_intent_id: link.stripe_payment_intent_id,
            client_secret: link.stripe_client_secret,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentLinkProductResponse {
    pub success: bool,
    pub product: PaymentLinkProduct,
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(SLUG_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Base-36 millisecond timestamp followed by a random suffix.
pub(crate) fn generate_slug(now_millis: i64) -> String {
    let random = uuid::Uuid::new_v4();
    let suffix: String = random
        .as_bytes()
        .iter()
        .take(SLUG_SUFFIX_LEN)
        .map(|b| SLUG_ALPHABET[*b as usize % SLUG_ALPHABET.len()] as char)
        .collect();
    format!("{}{}", to_base36(now_millis.max(0) as u64), suffix)
}

/// Pick a slug not yet in use.
fn unused_slug(repo: &PaymentLinkRepository<'_>) -> Result<String, ApiError> {
    for _ in 0..SLUG_ATTEMPTS {
        let slug = generate_slug(Utc::now().timestamp_millis());
        if repo.get_by_slug(&slug)?.is_none() {
            return Ok(slug);
        }
        tracing::warn!(slug = %slug, "Payment link slug collision, regenerating");
    }
    Err(ApiError::internal("Could not allocate a unique payment link slug"))
}

/// Create a payment link.
///
/// When an amount is given a Stripe payment intent is created up front and
/// tied to the slug through its metadata.
#[utoipa::path(
    post,
    path = "/api/payment-links/create",
    tag = "Payment Links",
    request_body = CreatePaymentLinkRequest,
    responses(
        (status = 201, description = "Payment link created", body = PaymentLinkResponse),
        (status = 400, description = "Invalid input"),
        (status = 500, description = "Stripe or storage failure")
    )
)]
pub async fn create_payment_link(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentLinkResponse>), ApiError> {
    let Json(request) = payload?;

    let name = non_blank(request.name).ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let link_type = request.link_type.unwrap_or_default();
    match (link_type, request.amount) {
        (PaymentLinkType::Product, None) => {
            return Err(ApiError::bad_request(
                "Amount is required for product payment links",
            ));
        }
        (PaymentLinkType::Product, Some(amount)) => {
            validate_positive_amount(amount).map_err(ApiError::bad_request)?;
        }
        (PaymentLinkType::General, Some(amount)) if !amount.is_finite() || amount < 0.0 => {
            return Err(ApiError::bad_request("Amount cannot be negative"));
        }
        (PaymentLinkType::General, Some(amount)) if amount > 0.0 => {
            validate_positive_amount(amount).map_err(ApiError::bad_request)?;
        }
        (PaymentLinkType::General, _) => {}
    }
    let seller_id =
        non_blank(request.seller_id).ok_or_else(|| ApiError::bad_request("Seller ID is required"))?;
    let currency = match non_blank(request.currency) {
        Some(raw) => normalize_currency(&raw).map_err(ApiError::bad_request)?,
        None => DEFAULT_CURRENCY.to_string(),
    };
    let amount = request.amount.filter(|a| *a > 0.0).map(round_to_cents);

    let repo = PaymentLinkRepository::new(&state.store);
    let slug = unused_slug(&repo)?;

    let intent = match amount {
        Some(amount) => {
            let metadata = BTreeMap::from([
                ("paymentLinkSlug".to_string(), slug.clone()),
                ("sellerId".to_string(), seller_id.clone()),
                (
                    "type".to_string(),
                    match link_type {
                        PaymentLinkType::Product => "product",
                        PaymentLinkType::General => "general",
                    }
                    .to_string(),
                ),
            ]);
            let intent = state
                .payments
                .create_payment_intent(CreatePaymentIntent {
                    amount_minor: to_minor_units(amount),
                    currency: currency.clone(),
                    metadata,
                    description: Some(name.clone()),
                    ..Default::default()
                })
                .await?;
            Some(intent)
        }
        None => None,
    };

    let now = Utc::now();
    let link = PaymentLink {
        id: uuid::Uuid::new_v4().to_string(),
        url: state.config.payment_link_url(&slug),
        slug,
        seller_id,
        link_type,
        name,
        description: non_blank(request.description),
        amount,
        currency,
        stripe_payment_intent_id: intent.as_ref().map(|i| i.id.clone()),
        stripe_client_secret: intent.and_then(|i| i.client_secret),
        status: PaymentLinkStatus::Active,
        created_at: now,
        updated_at: now,
    };
    repo.create(&link)?;

    info!(
        slug = %link.slug,
        seller_id = %link.seller_id,
        payment_intent = ?link.stripe_payment_intent_id,
        "Payment link created"
    );

    Ok((
        StatusCode::CREATED,
        Json(PaymentLinkResponse {
            success: true,
            payment_link: link,
        }),
    ))
}

/// List a seller's payment links, newest first.
#[utoipa::path(
    get,
    path = "/api/payment-links",
    tag = "Payment Links",
    params(ListPaymentLinksQuery),
    responses(
        (status = 200, description = "One page of payment links", body = PaymentLinkListResponse),
        (status = 400, description = "Missing sellerId or bad filter"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list_payment_links(
    State(state): State<AppState>,
    query: Result<Query<ListPaymentLinksQuery>, QueryRejection>,
) -> Result<Json<PaymentLinkListResponse>, ApiError> {
    let Query(query) = query?;
    let seller_id =
        non_blank(query.seller_id).ok_or_else(|| ApiError::bad_request("Seller ID is required"))?;

    let offset = query.offset.unwrap_or(0);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    let filter = PaymentLinkFilter {
        status: query.status,
        link_type: query.link_type,
    };

    let links = PaymentLinkRepository::new(&state.store).list_by_seller(&seller_id, &filter)?;
    let (payment_links, pagination) = paginate(links, offset, limit);

    Ok(Json(PaymentLinkListResponse {
        success: true,
        payment_links,
        pagination,
    }))
}

/// Public lookup of a payment link by slug.
#[utoipa::path(
    get,
    path = "/api/payment-links/{slug}",
    tag = "Payment Links",
    params(
        ("slug" = String, Path, description = "Payment link slug")
    ),
    responses(
        (status = 200, description = "Payment page view", body = PaymentLinkProductResponse),
        (status = 404, description = "Payment link not found")
    )
)]
pub async fn get_payment_link(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PaymentLinkProductResponse>, ApiError> {
    let link = PaymentLinkRepository::new(&state.store)
        .get_by_slug(&slug)?
        .ok_or_else(|| ApiError::not_found("Payment link not found"))?;

    Ok(Json(PaymentLinkProductResponse {
        success: true,
        product: link.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        providers::{MockPaymentProcessor, PaymentIntent, StripeError},
        state::tests::{state_with, test_state, Mocks},
        storage::repository::payment_links::tests::sample_link,
    };

    fn request(link_type: PaymentLinkType, amount: Option<f64>) -> CreatePaymentLinkRequest {
        CreatePaymentLinkRequest {
            name: Some("Ebook".to_string()),
            amount,
            currency: Some("USD".to_string()),
            seller_id: Some("seller-1".to_string()),
            link_type: Some(link_type),
            ..Default::default()
        }
    }

    #[test]
    fn slugs_are_base36_and_distinct() {
        let slug = generate_slug(1_700_000_000_000);
        assert!(slug.starts_with(&to_base36(1_700_000_000_000)));
        assert!(slug
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(slug, generate_slug(1_700_000_000_000));
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[tokio::test]
    async fn product_link_requires_positive_amount() {
        let (state, _dir) = test_state();
        for amount in [None, Some(0.0), Some(-5.0)] {
            let err = create_payment_link(
                State(state.clone()),
                Ok(Json(request(PaymentLinkType::Product, amount))),
            )
            .await
            .unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn sub_cent_amounts_never_reach_stripe() {
        let (state, _dir) = test_state();
        for link_type in [PaymentLinkType::Product, PaymentLinkType::General] {
            let err = create_payment_link(
                State(state.clone()),
                Ok(Json(request(link_type, Some(0.001)))),
            )
            .await
            .unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.message, "Amount must be at least 0.01");
        }
    }

    #[tokio::test]
    async fn stored_amount_matches_charged_cents() {
        let mut payments = MockPaymentProcessor::new();
        payments
            .expect_create_payment_intent()
            .withf(|req| req.amount_minor == 2000)
            .times(1)
            .returning(|req| {
                Ok(PaymentIntent {
                    id: "pi_round".to_string(),
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

        let (_, Json(body)) = create_payment_link(
            State(state),
            Ok(Json(request(PaymentLinkType::Product, Some(19.999)))),
        )
        .await
        .unwrap();
        assert_eq!(body.payment_link.amount, Some(20.0));
    }

    #[tokio::test]
    async fn name_is_checked_first() {
        let (state, _dir) = test_state();
        let mut req = request(PaymentLinkType::Product, None);
        req.name = Some("   ".to_string());
        let err = create_payment_link(State(state), Ok(Json(req)))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Name is required");
    }

    #[tokio::test]
    async fn seller_is_required_to_create() {
        let mut processor = MockPaymentProcessor::new();
        processor.expect_create_payment_intent().never();
        let (state, _dir) = state_with(Mocks {
            payments: processor,
            ..Default::default()
        });

        for seller in [None, Some("  ".to_string())] {
            let mut req = request(PaymentLinkType::Product, Some(25.0));
            req.seller_id = seller;
            let err = create_payment_link(State(state.clone()), Ok(Json(req)))
                .await
                .unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.message, "Seller ID is required");
        }
    }

    #[tokio::test]
    async fn product_link_creates_stripe_intent() {
        let mut payments = MockPaymentProcessor::new();
        payments
            .expect_create_payment_intent()
            .withf(|req| {
                req.amount_minor == 100_000
                    && req.currency == "usd"
                    && req.metadata.get("sellerId").map(String::as_str) == Some("seller-1")
                    && req.metadata.get("type").map(String::as_str) == Some("product")
                    && req.metadata.contains_key("paymentLinkSlug")
            })
            .times(1)
            .returning(|req| {
                Ok(PaymentIntent {
                    id: "pi_123".to_string(),
                    client_secret: Some("pi_123_secret".to_string()),
                    status: "requires_payment_method".to_string(),
                    amount: req.amount_minor,
                    currency: req.currency,
                })
            });
        let (state, _dir) = state_with(Mocks {
            payments,
            ..Default::default()
        });

        let (status, Json(body)) = create_payment_link(
            State(state.clone()),
            Ok(Json(request(PaymentLinkType::Product, Some(1000.0)))),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        let link = body.payment_link;
        assert!(link.url.ends_with(&link.slug));
        assert_eq!(link.url, format!("http://localhost:3000/pay/{}", link.slug));
        assert_eq!(link.stripe_payment_intent_id.as_deref(), Some("pi_123"));
        assert_eq!(link.currency, "usd");

        let stored = PaymentLinkRepository::new(&state.store)
            .get_by_slug(&link.slug)
            .unwrap()
            .unwrap();
        assert_eq!(stored, link);
    }

    #[tokio::test]
    async fn general_link_without_amount_skips_stripe() {
        let (state, _dir) = test_state();
        let (_, Json(body)) = create_payment_link(
            State(state),
            Ok(Json(request(PaymentLinkType::General, None))),
        )
        .await
        .unwrap();
        assert!(body.payment_link.stripe_payment_intent_id.is_none());
        assert_eq!(body.payment_link.link_type, PaymentLinkType::General);
    }

    #[tokio::test]
    async fn stripe_failure_is_a_server_error() {
        let mut payments = MockPaymentProcessor::new();
        payments
            .expect_create_payment_intent()
            .returning(|_| Err(StripeError::Api("card_error: declined".to_string())));
        let (state, _dir) = state_with(Mocks {
            payments,
            ..Default::default()
        });

        let err = create_payment_link(
            State(state.clone()),
            Ok(Json(request(PaymentLinkType::Product, Some(10.0)))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let links = PaymentLinkRepository::new(&state.store)
            .list_by_seller("seller-1", &PaymentLinkFilter::default())
            .unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn missing_slug_is_not_found() {
        let (state, _dir) = test_state();
        let err = get_payment_link(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Payment link not found");
    }

    #[tokio::test]
    async fn slug_lookup_returns_product_view() {
        let (state, _dir) = test_state();
        let mut link = sample_link("abc123", "seller-1");
        link.amount = Some(19.99);
        PaymentLinkRepository::new(&state.store).create(&link).unwrap();

        let Json(body) = get_payment_link(State(state), Path("abc123".to_string()))
            .await
            .unwrap();
        assert_eq!(body.product.price, Some(19.99));
        assert_eq!(body.product.price_usdc.as_deref(), Some("19990000"));
        assert_eq!(body.product.slug, "abc123");
    }

    #[tokio::test]
    async fn list_requires_seller_and_paginates() {
        let (state, _dir) = test_state();
        let query = |seller: Option<&str>, offset, limit| ListPaymentLinksQuery {
            seller_id: seller.map(str::to_string),
            status: None,
            link_type: None,
            offset,
            limit,
        };

        let err = list_payment_links(State(state.clone()), Ok(Query(query(None, None, None))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let repo = PaymentLinkRepository::new(&state.store);
        for i in 0..3 {
            repo.create(&sample_link(&format!("slug-{i}"), "seller-1"))
                .unwrap();
        }

        let Json(page) = list_payment_links(
            State(state.clone()),
            Ok(Query(query(Some("seller-1"), Some(1), Some(1)))),
        )
        .await
        .unwrap();
        assert_eq!(page.payment_links.len(), 1);
        assert_eq!(page.pagination, Pagination::new(3, 1, 1));
        assert!(page.pagination.has_more);

        let Json(all) = list_payment_links(
            State(state),
            Ok(Query(query(Some("seller-1"), None, Some(500)))),
        )
        .await
        .unwrap();
        assert_eq!(all.pagination.limit, MAX_PAGE_LIMIT);
        assert!(!all.pagination.has_more);
    }

    #[tokio::test]
    async fn offset_past_the_end_returns_empty_page() {
        let (state, _dir) = test_state();
        PaymentLinkRepository::new(&state.store)
            .create(&sample_link("only", "seller-1"))
            .unwrap();

        let Json(page) = list_payment_links(
            State(state),
            Ok(Query(ListPaymentLinksQuery {
                seller_id: Some("seller-1".to_string()),
                status: None,
                link_type: None,
                offset: Some(usize::MAX),
                limit: Some(10),
            })),
        )
        .await
        .unwrap();
        assert!(page.payment_links.is_empty());
        assert_eq!(page.pagination.total, 1);
        assert!(!page.pagination.has_more);
    }
}
