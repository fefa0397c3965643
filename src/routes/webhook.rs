// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for Stripe events.

use crate::error::{AppError, Result};
use crate::services::billing;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(handle_event))
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Handle incoming webhook events (POST).
///
/// The body is taken raw because the signature covers the exact bytes Stripe
/// sent. Verified events that we can't act on still get a 200 so Stripe
/// doesn't retry them; store failures return 500 so it does.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("missing Stripe-Signature header".to_string()))?;

    let now = Utc::now();
    let event = state
        .stripe
        .verify_webhook_signature(&body, signature, now.timestamp())?;

    tracing::info!(
        event_type = %event.event_type,
        event_id = ?event.id,
        "Stripe webhook event received"
    );

    let outcome = billing::handle_webhook_event(&state.db, &event, now).await?;
    tracing::debug!(?outcome, "Stripe webhook event handled");

    Ok(Json(WebhookAck { received: true }))
}
