// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::Request,
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::AuthenticatedSession,
    blockchain::VerificationOutcome,
    models::Pagination,
    providers::AssetBalance,
    state::AppState,
    storage::{
        Payment, PaymentLink, PaymentLinkStatus, PaymentLinkType, PaymentStatus, PayoutStatus,
        Product, User,
    },
};

pub mod analytics;
pub mod auth;
pub mod health;
pub mod payment_links;
pub mod payments;
pub mod payouts;
pub mod products;
pub mod users;
pub mod verify;
pub mod wallets;
pub mod webhooks;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/payment-links", get(payment_links::list_payment_links))
        .route(
            "/payment-links/create",
            post(payment_links::create_payment_link),
        )
        .route("/payment-links/{slug}", get(payment_links::get_payment_link))
        .route("/payments/create-intent", post(payments::create_intent))
        .route("/payments/status", get(payments::payment_status))
        .route("/verify-payment", post(verify::verify_payment))
        .route("/payouts/status", get(payouts::payout_status))
        .route(
            "/user/wallet",
            get(wallets::get_user_wallet).post(wallets::provision_user_wallet),
        )
        .route("/wallets/balance", get(wallets::wallet_balance))
        .route("/analytics", get(analytics::seller_analytics))
        .route("/users/connect", post(users::connect_user))
        .route("/users/{id}", get(users::get_user))
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/auth/nonce", get(auth::get_nonce))
        .route("/auth/verify", post(auth::verify_siwe))
        .route("/auth/session", get(auth::get_session))
        .route("/webhooks/stripe", post(webhooks::stripe_webhook));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let http_layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(request_id));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(http_layers)
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        payment_links::create_payment_link,
        payment_links::list_payment_links,
        payment_links::get_payment_link,
        payments::create_intent,
        payments::payment_status,
        verify::verify_payment,
        payouts::payout_status,
        wallets::get_user_wallet,
        wallets::provision_user_wallet,
        wallets::wallet_balance,
        analytics::seller_analytics,
        users::connect_user,
        users::get_user,
        products::create_product,
        products::list_products,
        auth::get_nonce,
        auth::verify_siwe,
        auth::get_session,
        webhooks::stripe_webhook,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            PaymentLink,
            PaymentLinkType,
            PaymentLinkStatus,
            Payment,
            PaymentStatus,
            PayoutStatus,
            Product,
            User,
            Pagination,
            AssetBalance,
            VerificationOutcome,
            AuthenticatedSession,
            payment_links::CreatePaymentLinkRequest,
            payment_links::PaymentLinkResponse,
            payment_links::PaymentLinkListResponse,
            payment_links::PaymentLinkProduct,
            payment_links::PaymentLinkProductResponse,
            payments::CreateIntentRequest,
            payments::CreateIntentResponse,
            payments::PaymentView,
            payments::PaymentStatusResponse,
            verify::VerifyPaymentRequest,
            verify::VerifyPaymentResponse,
            payouts::PayoutStatusResponse,
            wallets::ProvisionWalletRequest,
            wallets::CustodialWalletView,
            wallets::WalletResponse,
            analytics::SellerAnalytics,
            analytics::AnalyticsResponse,
            users::ConnectUserRequest,
            users::ConnectUserResponse,
            users::UserResponse,
            products::CreateProductRequest,
            products::ProductResponse,
            products::ProductListResponse,
            auth::NonceResponse,
            auth::VerifySiweRequest,
            auth::SessionResponse,
            webhooks::WebhookAck,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Payment Links", description = "Payment link creation and lookup"),
        (name = "Payments", description = "Payment intents, status and on-chain verification"),
        (name = "Payouts", description = "Payout status from the custodial provider"),
        (name = "Wallets", description = "Custodial seller wallets"),
        (name = "Analytics", description = "Seller dashboard summary"),
        (name = "Users", description = "Users keyed by wallet address"),
        (name = "Products", description = "Seller catalog"),
        (name = "Auth", description = "Sign-In With Ethereum and sessions"),
        (name = "Webhooks", description = "Stripe event delivery"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
