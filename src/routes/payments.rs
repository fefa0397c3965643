// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Checkout routes for the premium plan.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::SuccessResponse;
use crate::services::{billing, CheckoutRequest};
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Payment routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/verify-payment", post(verify_payment))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Start a Stripe Checkout for the caller.
async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<CheckoutResponse>> {
    if auth.user.is_premium() {
        return Err(AppError::BadRequest(
            "User already has the premium plan".to_string(),
        ));
    }

    let client_url = &state.config.client_url;
    let url = state
        .stripe
        .create_checkout_session(CheckoutRequest {
            user_id: &auth.user.id,
            customer_email: auth.user.email.as_deref(),
            success_url: format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", client_url),
            cancel_url: client_url.clone(),
        })
        .await?;

    tracing::info!(user_id = %auth.user.id, "Checkout session created");

    Ok(Json(CheckoutResponse { url }))
}

#[derive(Deserialize)]
pub struct VerifyPaymentRequest {
    session_id: String,
}

/// Confirm a Checkout session after the browser returns from Stripe.
///
/// Every failure, including Stripe being unreachable, is reported as a
/// verification failure so the client shows one message.
async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<SuccessResponse>> {
    let session = state
        .stripe
        .retrieve_checkout_session(request.session_id.trim())
        .await
        .map_err(|e| AppError::PaymentVerification(e.to_string()))?;

    billing::verify_and_upgrade(&state.db, &session, &auth.user.id, Utc::now())
        .await
        .map_err(|e| match e {
            AppError::Database(_) | AppError::PaymentVerification(_) => e,
            other => AppError::PaymentVerification(other.to_string()),
        })?;

    Ok(Json(SuccessResponse { success: true }))
}
