// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use course_paywall::config::Config;
use course_paywall::db::{Database, FirestoreDb};
use course_paywall::middleware::auth::create_session;
use course_paywall::models::{Plan, User};
use course_paywall::routes::create_router;
use course_paywall::AppState;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::with_db(config, Database::in_memory()).expect("Failed to build app state"),
    );
    (create_router(state.clone()), state)
}

/// Store a user and return it.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, id: &str, email: Option<&str>, plan: Plan) -> User {
    let mut user = User::new_basic(
        id,
        format!("User {}", id),
        email.map(String::from),
        Some(format!("https://example.com/{}.png", id)),
        Utc::now(),
    );
    state.db.upsert_user(&user).await.unwrap();

    if plan == Plan::Premium {
        state.db.upgrade_to_premium(id, Utc::now()).await.unwrap();
        user = state.db.get_user(id).await.unwrap().unwrap();
    }
    user
}

/// A `Cookie` header value carrying a fresh session for `user_id`.
#[allow(dead_code)]
pub async fn login_cookie(state: &AppState, user_id: &str) -> String {
    let token = create_session(state, user_id).await.unwrap();
    format!("course_session={}", token)
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` header values on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// Build a `Stripe-Signature` header for a payload.
#[allow(dead_code)]
pub fn stripe_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// Serve a router on an ephemeral localhost port and return its base URL.
#[allow(dead_code)]
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// ─── Fake Google ─────────────────────────────────────────────

/// Fake Google token and userinfo endpoints.
///
/// The authorization code doubles as the account name: code `alice` yields
/// subject `google-alice` with email `alice@example.com`. Code `bad` is
/// rejected by the token endpoint.
#[allow(dead_code)]
pub async fn spawn_fake_google() -> String {
    async fn token(body: String) -> Response {
        let code = body
            .split('&')
            .find_map(|kv| kv.strip_prefix("code="))
            .unwrap_or_default()
            .to_string();
        if code == "bad" || code.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant" })),
            )
                .into_response();
        }
        Json(json!({
            "access_token": format!("at_{}", code),
            "expires_in": 3599,
            "token_type": "Bearer",
        }))
        .into_response()
    }

    async fn userinfo(headers: HeaderMap) -> Response {
        let name = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer at_"))
            .map(String::from);
        match name {
            Some(name) => Json(json!({
                "sub": format!("google-{}", name),
                "name": capitalize(&name),
                "email": format!("{}@example.com", name),
                "picture": format!("https://lh3.example.com/{}.png", name),
            }))
            .into_response(),
            None => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    let router = Router::new()
        .route("/token", post(token))
        .route("/userinfo", get(userinfo));
    spawn_server(router).await
}

#[allow(dead_code)]
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Point a config at a fake Google server.
#[allow(dead_code)]
pub fn with_google(mut config: Config, base_url: &str) -> Config {
    config.google_token_url = format!("{}/token", base_url);
    config.google_userinfo_url = format!("{}/userinfo", base_url);
    config
}

// ─── Fake Stripe ─────────────────────────────────────────────

/// Form bodies received by the fake Stripe checkout endpoint.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct StripeRecorder {
    pub checkout_forms: Arc<Mutex<Vec<String>>>,
}

/// Fake Stripe Checkout API.
///
/// Session IDs encode their own state: `cs_paid_<user>` is paid for
/// `<user>`, `cs_unpaid_<user>` is not, anything else is unknown.
#[allow(dead_code)]
pub async fn spawn_fake_stripe() -> (String, StripeRecorder) {
    async fn create(State(recorder): State<StripeRecorder>, body: String) -> Json<Value> {
        recorder.checkout_forms.lock().unwrap().push(body);
        Json(json!({
            "id": "cs_test_new",
            "object": "checkout.session",
            "url": "https://checkout.stripe.test/c/pay/cs_test_new",
            "payment_status": "unpaid",
        }))
    }

    async fn retrieve(Path(id): Path<String>) -> Response {
        let (status, user) = if let Some(user) = id.strip_prefix("cs_paid_") {
            ("paid", user)
        } else if let Some(user) = id.strip_prefix("cs_unpaid_") {
            ("unpaid", user)
        } else {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": {
                        "type": "invalid_request_error",
                        "code": "resource_missing",
                        "message": format!("No such checkout.session: '{}'", id),
                    }
                })),
            )
                .into_response();
        };

        Json(json!({
            "id": &id,
            "object": "checkout.session",
            "payment_status": status,
            "status": "complete",
            "amount_total": 2999,
            "metadata": { "userId": user },
        }))
        .into_response()
    }

    let recorder = StripeRecorder::default();
    let router = Router::new()
        .route("/checkout/sessions", post(create))
        .route("/checkout/sessions/{id}", get(retrieve))
        .with_state(recorder.clone());
    (spawn_server(router).await, recorder)
}

/// Point a config at a fake Stripe server.
#[allow(dead_code)]
pub fn with_stripe(mut config: Config, base_url: &str) -> Config {
    config.stripe_api_url = base_url.to_string();
    config
}
