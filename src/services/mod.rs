// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod billing;
pub mod google;
pub mod stripe;

pub use billing::WebhookOutcome;
pub use google::{GoogleOAuthClient, GoogleProfile};
pub use stripe::{CheckoutRequest, CheckoutSession, StripeClient, StripeEvent};
