// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Checkout and payment verification tests against a fake Stripe API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use course_paywall::config::Config;
use course_paywall::models::Plan;
use course_paywall::AppState;
use std::sync::Arc;
use tower::ServiceExt;

mod common;
use common::{
    body_json, create_test_app_with_config, login_cookie, seed_user, spawn_fake_stripe,
    stripe_signature, StripeRecorder,
};

async fn app_with_fake_stripe() -> (Router, Arc<AppState>, StripeRecorder) {
    let (stripe, recorder) = spawn_fake_stripe().await;
    let (app, state) =
        create_test_app_with_config(common::with_stripe(Config::test_default(), &stripe));
    (app, state, recorder)
}

fn post(uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_create_checkout_session_returns_url() {
    let (app, state, recorder) = app_with_fake_stripe().await;
    seed_user(&state, "u1", Some("u1@example.com"), Plan::Basic).await;
    let cookie = login_cookie(&state, "u1").await;

    let response = app
        .oneshot(post("/create-checkout-session", &cookie, serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["url"],
        "https://checkout.stripe.test/c/pay/cs_test_new"
    );

    let forms = recorder.checkout_forms.lock().unwrap().clone();
    assert_eq!(forms.len(), 1);
    let form: Vec<(String, String)> = forms[0]
        .split('&')
        .map(|kv| {
            let (k, v) = kv.split_once('=').unwrap();
            (
                urlencoding::decode(k).unwrap().into_owned(),
                urlencoding::decode(&v.replace('+', " ")).unwrap().into_owned(),
            )
        })
        .collect();
    let field = |name: &str| {
        form.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| panic!("missing form field {}", name))
    };

    assert_eq!(field("mode"), "payment");
    assert_eq!(field("line_items[0][price_data][currency]"), "usd");
    assert_eq!(field("line_items[0][price_data][unit_amount]"), "2999");
    assert_eq!(field("line_items[0][price_data][product_data][name]"), "Premium Plan");
    assert_eq!(field("line_items[0][quantity]"), "1");
    assert_eq!(field("metadata[userId]"), "u1");
    assert_eq!(field("customer_email"), "u1@example.com");
    assert_eq!(
        field("success_url"),
        "http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}"
    );
    assert_eq!(field("cancel_url"), "http://localhost:3000");
}

#[tokio::test]
async fn test_checkout_requires_session() {
    let (app, _, recorder) = app_with_fake_stripe().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/create-checkout-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(recorder.checkout_forms.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_premium_user_cannot_checkout_again() {
    let (app, state, recorder) = app_with_fake_stripe().await;
    seed_user(&state, "u1", None, Plan::Premium).await;
    let cookie = login_cookie(&state, "u1").await;

    let response = app
        .oneshot(post("/create-checkout-session", &cookie, serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(recorder.checkout_forms.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stripe_outage_is_bad_gateway() {
    let mut config = Config::test_default();
    // Nothing listens on port 9 locally.
    config.stripe_api_url = "http://127.0.0.1:9".to_string();
    let (app, state) = create_test_app_with_config(config);
    seed_user(&state, "u1", None, Plan::Basic).await;
    let cookie = login_cookie(&state, "u1").await;

    let response = app
        .oneshot(post("/create-checkout-session", &cookie, serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_verify_paid_session_upgrades_once() {
    let (app, state, _) = app_with_fake_stripe().await;
    seed_user(&state, "u1", None, Plan::Basic).await;
    let cookie = login_cookie(&state, "u1").await;

    let response = app
        .clone()
        .oneshot(post(
            "/verify-payment",
            &cookie,
            serde_json::json!({ "session_id": "cs_paid_u1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let first = state.db.get_user("u1").await.unwrap().unwrap();
    assert_eq!(first.plan, Plan::Premium);
    let purchased = first.purchase_date.expect("purchase date should be set");

    // Reloading the success page verifies again; the purchase date stays.
    let response = app
        .clone()
        .oneshot(post(
            "/verify-payment",
            &cookie,
            serde_json::json!({ "session_id": "cs_paid_u1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let again = state.db.get_user("u1").await.unwrap().unwrap();
    assert_eq!(again.purchase_date, Some(purchased));

    let status = app
        .oneshot(
            Request::builder()
                .uri("/auth/status")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(status).await["user"]["plan"], "premium");
}

#[tokio::test]
async fn test_verify_rejections() {
    let (app, state, _) = app_with_fake_stripe().await;
    seed_user(&state, "u1", None, Plan::Basic).await;
    let cookie = login_cookie(&state, "u1").await;

    for session_id in ["cs_unpaid_u1", "cs_paid_u2", "cs_missing", "../../etc", ""] {
        let response = app
            .clone()
            .oneshot(post(
                "/verify-payment",
                &cookie,
                serde_json::json!({ "session_id": session_id }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", session_id);
        assert_eq!(
            body_json(response).await["error"],
            "payment_verification_failed",
            "{}",
            session_id
        );
    }

    let user = state.db.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.plan, Plan::Basic);
    assert!(user.purchase_date.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_webhook_and_verify_race_converge() {
    let (app, state, _) = app_with_fake_stripe().await;

    for i in 0..8 {
        let user_id = format!("race{}", i);
        seed_user(&state, &user_id, None, Plan::Basic).await;
        let cookie = login_cookie(&state, &user_id).await;

        let payload = serde_json::json!({
            "id": format!("evt_{}", user_id),
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": format!("cs_paid_{}", user_id),
                "payment_status": "paid",
                "metadata": { "userId": &user_id },
            }}
        })
        .to_string();
        let signature =
            stripe_signature(payload.as_bytes(), "whsec_test_secret", Utc::now().timestamp());
        let webhook = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("Stripe-Signature", signature)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .unwrap();
        let verify = post(
            "/verify-payment",
            &cookie,
            serde_json::json!({ "session_id": format!("cs_paid_{}", user_id) }),
        );

        let (webhook, verify) = tokio::join!(
            tokio::spawn(app.clone().oneshot(webhook)),
            tokio::spawn(app.clone().oneshot(verify)),
        );
        assert_eq!(webhook.unwrap().unwrap().status(), StatusCode::OK);
        assert_eq!(verify.unwrap().unwrap().status(), StatusCode::OK);

        let user = state.db.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(user.plan, Plan::Premium);
        let purchased = user.purchase_date.expect("purchase date should be set");

        // A late redelivery must not move the purchase date.
        let response = app
            .clone()
            .oneshot(post(
                "/verify-payment",
                &cookie,
                serde_json::json!({ "session_id": format!("cs_paid_{}", user_id) }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let user = state.db.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(user.purchase_date, Some(purchased));
    }

    assert_eq!(state.db.list_premium_users().await.unwrap().len(), 8);
}
