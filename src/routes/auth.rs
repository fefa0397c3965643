// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth authentication routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    create_session, decode_jwt, removal_cookie, resolve_session, session_cookie,
    token_from_request,
};
use crate::models::User;
use crate::services::GoogleProfile;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth state stays valid.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

/// Allowed clock skew for state timestamps from the future.
const STATE_CLOCK_SKEW_MS: u128 = 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/status", get(auth_status))
        .route("/auth/logout", get(logout))
}

/// Query parameters for starting OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to return to after sign-in. Ignored unless it is an
    /// allowed origin; defaults to CLIENT_URL.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start OAuth flow - redirect to Google's consent screen.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
) -> Result<Redirect> {
    let frontend_url = params
        .redirect_uri
        .map(|u| u.trim_end_matches('/').to_string())
        .filter(|u| state.config.is_allowed_origin(u))
        .unwrap_or_else(|| state.config.client_url.clone());

    let oauth_state = sign_state(&frontend_url, now_millis(), &state.config.session_secret)?;

    tracing::info!(
        frontend_url = %frontend_url,
        "Starting OAuth flow, redirecting to Google"
    );

    Ok(Redirect::temporary(
        &state.google.authorize_url(&oauth_state),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, find or create the user, start a session.
///
/// Every failure sends the browser to the login page.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let failure = Redirect::temporary(&format!("{}/login", state.config.client_url));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return failure.into_response();
    }

    let Some(frontend_url) = params.state.as_deref().and_then(|s| {
        verify_and_decode_state(s, &state.config.session_secret, now_millis())
    }) else {
        tracing::warn!("Invalid, expired or missing OAuth state parameter");
        return failure.into_response();
    };

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("OAuth callback without authorization code");
        return failure.into_response();
    };

    match complete_login(&state, &code).await {
        Ok((user, token)) => {
            tracing::info!(
                user_id = %user.id,
                plan = user.plan.as_str(),
                "OAuth successful, session created"
            );
            let jar = jar.add(session_cookie(&state.config, token));
            (jar, Redirect::temporary(&frontend_url)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "OAuth login failed");
            failure.into_response()
        }
    }
}

/// Exchange the code, upsert the user, and create a session token.
async fn complete_login(state: &AppState, code: &str) -> Result<(User, String)> {
    let tokens = state.google.exchange_code(code).await?;
    let profile = state.google.fetch_profile(&tokens.access_token).await?;

    let user = find_or_create_user(state, &profile).await?;
    let token = create_session(state, &user.id).await?;
    Ok((user, token))
}

/// Returning users get their Google profile fields refreshed; plan and
/// location are left alone.
async fn find_or_create_user(state: &AppState, profile: &GoogleProfile) -> Result<User> {
    let fresh = User::new_basic(
        &profile.sub,
        profile.display_name(),
        profile.email.clone(),
        profile.picture.clone(),
        Utc::now(),
    );

    match state.db.get_user(&profile.sub).await? {
        Some(mut existing) => {
            state.db.update_profile(&fresh).await?;
            existing.display_name = fresh.display_name;
            existing.email = fresh.email;
            existing.profile_picture = fresh.profile_picture;
            Ok(existing)
        }
        None => {
            tracing::info!(user_id = %fresh.id, "Creating new user");
            state.db.upsert_user(&fresh).await?;
            Ok(fresh)
        }
    }
}

/// Login status response.
#[derive(Serialize)]
pub struct AuthStatusResponse {
    pub user: Option<User>,
}

/// Current user, or `null` when there is no live session.
async fn auth_status(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<AuthStatusResponse>> {
    let user = resolve_session(&state, &jar, &headers)
        .await?
        .map(|auth| auth.user);
    Ok(Json(AuthStatusResponse { user }))
}

/// Logout - delete the session, clear the cookie, go back to the site.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Redirect)> {
    if let Some(claims) = token_from_request(&jar, &headers)
        .and_then(|token| decode_jwt(&token, &state.config.session_secret))
    {
        state.db.delete_session(&claims.sid).await?;
        tracing::info!(user_id = %claims.sub, "User logged out");
    }

    let jar = jar.add(removal_cookie(&state.config));
    Ok((jar, Redirect::temporary(&state.config.client_url)))
}

fn now_millis() -> u128 {
    Utc::now().timestamp_millis().max(0) as u128
}

/// Build the signed OAuth state: base64url("frontend_url|timestamp_hex|signature_hex").
fn sign_state(frontend_url: &str, now_ms: u128, secret: &[u8]) -> Result<String> {
    let state_payload = format!("{}|{:x}", frontend_url, now_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify HMAC signature and age, then decode the frontend URL from the OAuth state.
fn verify_and_decode_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // The URL may itself contain '|', so split from the right.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let frontend_url = parts.next()?;

    let payload = format!("{}|{}", frontend_url, timestamp_hex);
    let signature = hex::decode(signature_hex).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if issued_ms > now_ms + STATE_CLOCK_SKEW_MS || now_ms.saturating_sub(issued_ms) > STATE_MAX_AGE_MS
    {
        tracing::warn!(age_ms = %now_ms.saturating_sub(issued_ms), "OAuth state expired");
        return None;
    }

    Some(frontend_url.to_string())
}
