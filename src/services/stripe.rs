// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Minimal Stripe client built on reqwest.
//!
//! Handles:
//! - Creating Checkout sessions for the premium plan
//! - Retrieving Checkout sessions for client-side verification
//! - Verifying `Stripe-Signature` headers on webhook deliveries

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::config::{Config, PREMIUM_PRICE_CENTS};
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum age (either direction) of a webhook signature timestamp.
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Metadata key carrying our user ID on Checkout sessions.
pub const METADATA_USER_ID: &str = "userId";

const PRODUCT_NAME: &str = "Premium Plan";
const PRODUCT_DESCRIPTION: &str = "Learn to build a web app from scratch using AI. \
    This course covers front-end, back-end development, and integrating AI features, \
    giving you the skills to create and deploy intelligent web applications.";

/// Checkout session as returned by the Stripe API and embedded in events.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata
            .get(METADATA_USER_ID)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// Webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// The event's object as a Checkout session, if it is one.
    pub fn checkout_session(&self) -> Option<CheckoutSession> {
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// Parameters for a premium-plan Checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub user_id: &'a str,
    pub customer_email: Option<&'a str>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: config.stripe_api_url.clone(),
            secret_key: config.stripe_secret_key.clone(),
            webhook_secret: config.stripe_webhook_secret.clone(),
        })
    }

    /// Create a one-time payment Checkout session and return its hosted URL.
    pub async fn create_checkout_session(
        &self,
        request: CheckoutRequest<'_>,
    ) -> Result<String, AppError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("line_items[0][price_data][currency]".into(), "usd".into()),
            (
                "line_items[0][price_data][product_data][name]".into(),
                PRODUCT_NAME.into(),
            ),
            (
                "line_items[0][price_data][product_data][description]".into(),
                PRODUCT_DESCRIPTION.into(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                PREMIUM_PRICE_CENTS.to_string(),
            ),
            ("line_items[0][quantity]".into(), "1".into()),
            ("success_url".into(), request.success_url),
            ("cancel_url".into(), request.cancel_url),
            (
                format!("metadata[{}]", METADATA_USER_ID),
                request.user_id.to_string(),
            ),
        ];
        if let Some(email) = request.customer_email {
            form.push(("customer_email".into(), email.to_string()));
        }

        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("Create checkout request failed: {}", e)))?;

        let session: CheckoutSession =
            Self::check_response_json(response, "create checkout session").await?;

        session
            .url
            .ok_or_else(|| AppError::Stripe("Checkout session URL is missing".to_string()))
    }

    /// Retrieve a Checkout session by ID.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, AppError> {
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::BadRequest("Malformed checkout session id".to_string()));
        }

        let response = self
            .http
            .get(format!("{}/checkout/sessions/{}", self.base_url, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("Retrieve checkout request failed: {}", e)))?;

        Self::check_response_json(response, "retrieve checkout session").await
    }

    /// Verify a webhook delivery and parse its event.
    ///
    /// `now` is the current Unix time in seconds.
    /// See <https://stripe.com/docs/webhooks/signatures>.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<StripeEvent, AppError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signatures.push(rest);
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            AppError::InvalidSignature("missing timestamp in Stripe-Signature".to_string())
        })?;
        if signatures.is_empty() {
            return Err(AppError::InvalidSignature(
                "missing v1 in Stripe-Signature".to_string(),
            ));
        }

        let issued_at: i64 = timestamp
            .parse()
            .map_err(|_| AppError::InvalidSignature("non-numeric timestamp".to_string()))?;
        let skew = now.abs_diff(issued_at);
        if skew > SIGNATURE_TOLERANCE_SECS {
            return Err(AppError::InvalidSignature(format!(
                "timestamp outside tolerance ({}s)",
                skew
            )));
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let matched = signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|provided| bool::from(expected.as_slice().ct_eq(&provided)))
                .unwrap_or(false)
        });
        if !matched {
            return Err(AppError::InvalidSignature("no matching v1 signature".to_string()));
        }

        serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Malformed Stripe event: {}", e)))
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let request_id = response
                .headers()
                .get("request-id")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let body = response.text().await.unwrap_or_default();

            let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .map(|e| e.error)
                .ok();

            tracing::error!(
                status = %status,
                stripe_request_id = ?request_id,
                stripe_error_type = ?details.as_ref().and_then(|d| d.error_type.as_deref()),
                stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
                stripe_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
                context = %context,
                "Stripe API request failed"
            );

            return Err(AppError::Stripe(format!("{}: HTTP {}", context, status)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Stripe(format!("{} JSON parse error: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_730_000_000;

    fn client() -> StripeClient {
        StripeClient::new(&Config::test_default()).unwrap()
    }

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    const PAYLOAD: &[u8] =
        br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1","payment_status":"paid","metadata":{"userId":"u1"}}}}"#;

    #[test]
    fn test_valid_signature_parses_event() {
        let header = sign(PAYLOAD, "whsec_test_secret", NOW);
        let event = client()
            .verify_webhook_signature(PAYLOAD, &header, NOW + 10)
            .expect("signature should verify");

        assert_eq!(event.event_type, "checkout.session.completed");
        let session = event.checkout_session().unwrap();
        assert!(session.is_paid());
        assert_eq!(session.user_id(), Some("u1"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = sign(PAYLOAD, "whsec_other", NOW);
        let err = client()
            .verify_webhook_signature(PAYLOAD, &header, NOW)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature(_)));
    }

    #[test]
    fn test_modified_payload_rejected() {
        let header = sign(PAYLOAD, "whsec_test_secret", NOW);
        let tampered = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1","payment_status":"paid","metadata":{"userId":"attacker"}}}}"#;
        assert!(client()
            .verify_webhook_signature(tampered, &header, NOW)
            .is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = sign(PAYLOAD, "whsec_test_secret", NOW - 600);
        assert!(client()
            .verify_webhook_signature(PAYLOAD, &header, NOW)
            .is_err());
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let valid = sign(PAYLOAD, "whsec_test_secret", NOW);
        let v1 = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1=deadbeef,v1={}", NOW, v1);
        assert!(client()
            .verify_webhook_signature(PAYLOAD, &header, NOW)
            .is_ok());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        for header in [
            "",
            "garbage",
            "t=123",
            "v1=abcd",
            "t=abc,v1=abcd",
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            assert!(
                client()
                    .verify_webhook_signature(PAYLOAD, header, NOW)
                    .is_err(),
                "header {:?} should be rejected",
                header
            );
        }
    }

    #[test]
    fn test_unpaid_session_has_no_paid_flag() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_2",
            "payment_status": "unpaid",
            "metadata": {}
        }))
        .unwrap();
        assert!(!session.is_paid());
        assert_eq!(session.user_id(), None);
    }
}
