// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plan reconciliation for completed Stripe payments.
//!
//! Both the client-initiated verify call and the webhook end up in
//! [`Database::upgrade_to_premium`], so whichever arrives first sets the
//! purchase date and the other is a no-op.

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::AppError;
use crate::models::UpgradeOutcome;
use crate::services::stripe::{CheckoutSession, StripeEvent};
use crate::time_utils::format_utc_rfc3339;

/// Event types that carry a settled Checkout session.
const PAID_EVENT_TYPES: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.async_payment_succeeded",
];

/// What the webhook did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Upgraded,
    AlreadyPremium,
    UnknownUser,
    Ignored,
}

/// Upgrade the caller after the browser returns from Checkout.
///
/// The session must be paid and must belong to `caller_id`.
pub async fn verify_and_upgrade(
    db: &Database,
    session: &CheckoutSession,
    caller_id: &str,
    now: DateTime<Utc>,
) -> Result<UpgradeOutcome, AppError> {
    if !session.is_paid() {
        return Err(AppError::PaymentVerification(format!(
            "session {} is not paid (status {:?})",
            session.id, session.payment_status
        )));
    }

    match session.user_id() {
        Some(owner) if owner == caller_id => {}
        owner => {
            return Err(AppError::PaymentVerification(format!(
                "session {} belongs to {:?}, not {}",
                session.id, owner, caller_id
            )));
        }
    }

    let outcome = db.upgrade_to_premium(caller_id, now).await?;
    match outcome {
        UpgradeOutcome::Upgraded => {
            tracing::info!(
                user_id = caller_id,
                session_id = %session.id,
                purchased_at = %format_utc_rfc3339(now),
                source = "verify",
                "User upgraded to premium"
            );
        }
        UpgradeOutcome::AlreadyPremium => {
            tracing::debug!(user_id = caller_id, session_id = %session.id, source = "verify", "User already premium");
        }
        UpgradeOutcome::UserNotFound => {
            return Err(AppError::PaymentVerification(format!(
                "user {} no longer exists",
                caller_id
            )));
        }
    }
    Ok(outcome)
}

/// Apply a verified webhook event.
///
/// Only store failures are errors; anything else is acknowledged so Stripe
/// stops redelivering it.
pub async fn handle_webhook_event(
    db: &Database,
    event: &StripeEvent,
    now: DateTime<Utc>,
) -> Result<WebhookOutcome, AppError> {
    if !PAID_EVENT_TYPES.contains(&event.event_type.as_str()) {
        tracing::debug!(event_type = %event.event_type, event_id = ?event.id, "Ignoring webhook event");
        return Ok(WebhookOutcome::Ignored);
    }

    let Some(session) = event.checkout_session() else {
        tracing::warn!(event_id = ?event.id, "Checkout event without a session object");
        return Ok(WebhookOutcome::Ignored);
    };

    if !session.is_paid() {
        tracing::info!(session_id = %session.id, status = ?session.payment_status, "Checkout session not paid yet");
        return Ok(WebhookOutcome::Ignored);
    }

    let Some(user_id) = session.user_id() else {
        tracing::warn!(session_id = %session.id, "Paid checkout session has no userId metadata");
        return Ok(WebhookOutcome::Ignored);
    };

    let outcome = match db.upgrade_to_premium(user_id, now).await? {
        UpgradeOutcome::Upgraded => {
            tracing::info!(
                user_id,
                session_id = %session.id,
                purchased_at = %format_utc_rfc3339(now),
                source = "webhook",
                "User upgraded to premium"
            );
            WebhookOutcome::Upgraded
        }
        UpgradeOutcome::AlreadyPremium => {
            tracing::debug!(user_id, session_id = %session.id, source = "webhook", "User already premium");
            WebhookOutcome::AlreadyPremium
        }
        UpgradeOutcome::UserNotFound => {
            tracing::warn!(user_id, session_id = %session.id, "Webhook for unknown user");
            WebhookOutcome::UnknownUser
        }
    };
    Ok(outcome)
}
