// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stripe webhook tests.
//!
//! These tests verify that:
//! 1. Only correctly signed, fresh deliveries are accepted
//! 2. A paid checkout event upgrades the referenced user exactly once
//! 3. Events we can't act on are still acknowledged with 200

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use course_paywall::models::Plan;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, seed_user, stripe_signature};

const SECRET: &str = "whsec_test_secret";

fn checkout_event(event_type: &str, user_id: &str, payment_status: &str) -> Vec<u8> {
    json!({
        "id": "evt_test_1",
        "object": "event",
        "type": event_type,
        "data": {
            "object": {
                "id": "cs_test_1",
                "object": "checkout.session",
                "payment_status": payment_status,
                "metadata": { "userId": user_id },
            }
        }
    })
    .to_string()
    .into_bytes()
}

async fn deliver(app: &Router, payload: Vec<u8>, signature: Option<String>) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("Content-Type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    app.clone()
        .oneshot(builder.body(Body::from(payload)).unwrap())
        .await
        .unwrap()
}

async fn deliver_signed(app: &Router, payload: Vec<u8>) -> Response {
    let signature = stripe_signature(&payload, SECRET, Utc::now().timestamp());
    deliver(app, payload, Some(signature)).await
}

#[tokio::test]
async fn test_completed_checkout_upgrades_user() {
    let (app, state) = create_test_app();
    seed_user(&state, "u1", None, Plan::Basic).await;

    let response = deliver_signed(
        &app,
        checkout_event("checkout.session.completed", "u1", "paid"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);

    let user = state.db.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.plan, Plan::Premium);
    assert!(user.purchase_date.is_some());
}

#[tokio::test]
async fn test_async_payment_succeeded_upgrades_user() {
    let (app, state) = create_test_app();
    seed_user(&state, "u1", None, Plan::Basic).await;

    let response = deliver_signed(
        &app,
        checkout_event("checkout.session.async_payment_succeeded", "u1", "paid"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        state.db.get_user("u1").await.unwrap().unwrap().plan,
        Plan::Premium
    );
}

#[tokio::test]
async fn test_redelivery_keeps_first_purchase_date() {
    let (app, state) = create_test_app();
    seed_user(&state, "u1", None, Plan::Basic).await;
    let payload = checkout_event("checkout.session.completed", "u1", "paid");

    deliver_signed(&app, payload.clone()).await;
    let first = state.db.get_user("u1").await.unwrap().unwrap().purchase_date;

    let response = deliver_signed(&app, payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = state.db.get_user("u1").await.unwrap().unwrap().purchase_date;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unpaid_checkout_does_not_upgrade() {
    let (app, state) = create_test_app();
    seed_user(&state, "u1", None, Plan::Basic).await;

    let response = deliver_signed(
        &app,
        checkout_event("checkout.session.completed", "u1", "unpaid"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        state.db.get_user("u1").await.unwrap().unwrap().plan,
        Plan::Basic
    );
}

#[tokio::test]
async fn test_unknown_user_and_other_events_are_acknowledged() {
    let (app, state) = create_test_app();

    let response = deliver_signed(
        &app,
        checkout_event("checkout.session.completed", "ghost", "paid"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);
    assert!(state.db.get_user("ghost").await.unwrap().is_none());

    let payload = json!({
        "id": "evt_2",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string()
    .into_bytes();
    let response = deliver_signed(&app, payload).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bad_signatures_rejected() {
    let (app, state) = create_test_app();
    seed_user(&state, "u1", None, Plan::Basic).await;
    let payload = checkout_event("checkout.session.completed", "u1", "paid");
    let now = Utc::now().timestamp();

    let cases = [
        None,
        Some("garbage".to_string()),
        Some(stripe_signature(&payload, "whsec_wrong", now)),
        Some(stripe_signature(&payload, SECRET, now - 3600)),
        Some(stripe_signature(b"different body", SECRET, now)),
    ];

    for signature in cases {
        let response = deliver(&app, payload.clone(), signature.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{:?}", signature);
    }

    assert_eq!(
        state.db.get_user("u1").await.unwrap().unwrap().plan,
        Plan::Basic
    );
}

#[tokio::test]
async fn test_invalid_signature_error_code() {
    let (app, _) = create_test_app();
    let payload = checkout_event("checkout.session.completed", "u1", "paid");

    let response = deliver(&app, payload, Some("t=1,v1=00".to_string())).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_signature");
}
