// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stripe webhook receiver.
//!
//! Card outcomes move the matching pending payment to `completed` or
//! `failed`. Events for unknown intents or already settled payments are
//! acknowledged without change so Stripe stops retrying them.

use axum::{
    extract::{FromRequest, Request, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use stripe::{Event, EventObject, EventType, Webhook};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    state::AppState,
    storage::{PaymentRepository, PaymentStatus},
};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a webhook signature timestamp, in seconds.
const WEBHOOK_TOLERANCE_SECS: u64 = 300;

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
}

/// A Stripe event whose signature has been verified against the endpoint secret.
pub struct SignedEvent(pub Event);

/// True when the header's `t=` timestamp is within tolerance of `now`.
fn timestamp_in_tolerance(header: &str, now: i64) -> bool {
    header
        .split(',')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == "t")
        .and_then(|(_, value)| value.parse::<i64>().ok())
        .and_then(|t| now.checked_sub(t))
        .is_some_and(|age| age.unsigned_abs() <= WEBHOOK_TOLERANCE_SECS)
}

impl FromRequest<AppState> for SignedEvent {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let secret = state
            .config
            .stripe
            .webhook_secret
            .clone()
            .ok_or_else(|| ApiError::internal("Stripe webhook is not configured"))?;
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| ApiError::bad_request("Missing Stripe-Signature header"))?;

        if !timestamp_in_tolerance(&signature, Utc::now().timestamp()) {
            warn!("Rejected Stripe webhook with missing or stale timestamp");
            return Err(ApiError::bad_request(
                "Webhook signature verification failed: timestamp outside tolerance",
            ));
        }

        let payload = String::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Unreadable webhook body: {e}")))?;

        let event = Webhook::construct_event(&payload, &signature, &secret).map_err(|e| {
            warn!(error = ?e, "Rejected Stripe webhook");
            ApiError::bad_request(format!("Webhook signature verification failed: {e}"))
        })?;
        Ok(Self(event))
    }
}

/// Payment status a Stripe event moves a payment to.
fn target_status(event_type: &EventType) -> Option<PaymentStatus> {
    match event_type {
        EventType::PaymentIntentSucceeded => Some(PaymentStatus::Completed),
        EventType::PaymentIntentPaymentFailed | EventType::PaymentIntentCanceled => {
            Some(PaymentStatus::Failed)
        }
        _ => None,
    }
}

#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    tag = "Webhooks",
    request_body(content = String, description = "Raw Stripe event JSON"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")
    ),
    responses(
        (status = 200, description = "Event processed or ignored", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature, or malformed event"),
        (status = 500, description = "Webhook not configured or storage failure")
    )
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    SignedEvent(event): SignedEvent,
) -> Result<Json<WebhookAck>, ApiError> {
    let Some(target) = target_status(&event.type_) else {
        debug!(event_id = %event.id, event_type = %event.type_, "Ignoring Stripe event");
        return Ok(Json(WebhookAck { received: true }));
    };
    let EventObject::PaymentIntent(intent) = &event.data.object else {
        return Err(ApiError::bad_request(
            "Stripe event does not carry a payment intent",
        ));
    };
    let intent_id = intent.id.as_str();

    let repo = PaymentRepository::new(&state.store);
    let Some(payment) = repo.get_by_intent(intent_id)? else {
        info!(event_id = %event.id, payment_intent = %intent_id, "No payment for intent");
        return Ok(Json(WebhookAck { received: true }));
    };

    let updated = repo.update(&payment.id, |p| {
        if p.status.is_terminal() {
            return Ok(());
        }
        match target {
            PaymentStatus::Completed => p.complete(None)?,
            _ => p.fail()?,
        }
        Ok(())
    })?;

    info!(
        event_id = %event.id,
        payment_id = %updated.id,
        previous = payment.status.as_str(),
        status = updated.status.as_str(),
        "Stripe webhook applied"
    );

    Ok(Json(WebhookAck { received: true }))
}
