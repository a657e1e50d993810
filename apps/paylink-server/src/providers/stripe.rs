// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stripe integration: payment intents through the `async-stripe` client.
//!
//! Handlers depend on [`PaymentProcessor`] and the crate's own request and
//! intent types; the SDK types stay inside this module.

use std::collections::{BTreeMap, HashMap};

use ::stripe::{Client, CreatePaymentIntentAutomaticPaymentMethods, Currency, RequestStrategy};
use async_trait::async_trait;
use tracing::info;

use crate::config::StripeConfig;

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("Stripe request failed: {0}")]
    Request(String),

    #[error("Stripe API error: {0}")]
    Api(String),

    #[error("Invalid payment intent request: {0}")]
    InvalidRequest(String),
}

impl From<::stripe::StripeError> for StripeError {
    fn from(e: ::stripe::StripeError) -> Self {
        match e {
            ::stripe::StripeError::Stripe(err) => {
                let message = err.message.unwrap_or_else(|| "unknown error".to_string());
                Self::Api(format!(
                    "{message} ({}, HTTP {})",
                    err.error_type, err.http_status
                ))
            }
            other => Self::Request(other.to_string()),
        }
    }
}

/// Parameters for a new payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreatePaymentIntent {
    /// Amount in the currency's minor unit (cents)
    pub amount_minor: i64,
    /// Lower-case currency code
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
    pub description: Option<String>,
    pub receipt_email: Option<String>,
    pub idempotency_key: Option<String>,
}

/// The subset of a Stripe PaymentIntent the service uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

impl From<::stripe::PaymentIntent> for PaymentIntent {
    fn from(intent: ::stripe::PaymentIntent) -> Self {
        Self {
            id: intent.id.to_string(),
            client_secret: intent.client_secret,
            status: intent.status.as_str().to_string(),
            amount: intent.amount,
            currency: intent.currency.to_string(),
        }
    }
}

/// Card payment processor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntent,
    ) -> Result<PaymentIntent, StripeError>;
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::from_url(config.api_base_url.as_str(), config.secret_key.as_str()),
        }
    }
}

fn parse_currency(code: &str) -> Result<Currency, StripeError> {
    code.parse::<Currency>()
        .map_err(|_| StripeError::InvalidRequest(format!("unsupported currency {code}")))
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntent,
    ) -> Result<PaymentIntent, StripeError> {
        let currency = parse_currency(&request.currency)?;

        let mut params = ::stripe::CreatePaymentIntent::new(request.amount_minor, currency);
        params.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            allow_redirects: None,
            enabled: true,
        });
        if !request.metadata.is_empty() {
            let metadata: HashMap<String, String> = request.metadata.clone().into_iter().collect();
            params.metadata = Some(metadata);
        }
        params.description = request.description.as_deref();
        params.receipt_email = request.receipt_email.as_deref();

        let client = match &request.idempotency_key {
            Some(key) => self
                .client
                .clone()
                .with_strategy(RequestStrategy::Idempotent(key.clone())),
            None => self.client.clone(),
        };

        let intent: PaymentIntent = ::stripe::PaymentIntent::create(&client, params)
            .await?
            .into();

        info!(
            payment_intent_id = %intent.id,
            amount = intent.amount,
            currency = %intent.currency,
            "Created Stripe payment intent"
        );
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_codes_map_to_stripe_currencies() {
        assert_eq!(parse_currency("usd").unwrap(), Currency::USD);
        assert_eq!(parse_currency("eur").unwrap(), Currency::EUR);
        assert!(matches!(
            parse_currency("zzz"),
            Err(StripeError::InvalidRequest(_))
        ));
    }

    #[test]
    fn api_errors_keep_stripe_message_and_status() {
        let err: StripeError = ::stripe::StripeError::Stripe(::stripe::RequestError {
            http_status: 401,
            error_type: ::stripe::ErrorType::InvalidRequest,
            message: Some("Invalid API Key provided".to_string()),
            ..Default::default()
        })
        .into();
        let StripeError::Api(message) = err else {
            panic!("expected an API error");
        };
        assert!(message.starts_with("Invalid API Key provided"));
        assert!(message.ends_with("HTTP 401)"));
    }

    #[test]
    fn transport_errors_are_request_errors() {
        let err: StripeError =
            ::stripe::StripeError::ClientError("connection refused".to_string()).into();
        assert!(matches!(err, StripeError::Request(_)));
    }
}
