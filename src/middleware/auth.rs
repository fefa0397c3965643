// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.
//!
//! The session cookie carries an HS256 JWT naming the user (`sub`) and the
//! server-side session document (`sid`). Both have to check out: a valid
//! signature alone is not enough once the session has been deleted.

use crate::config::{Config, SESSION_COOKIE_NAME, SESSION_TTL_SECS};
use crate::error::AppError;
use crate::models::{Session, User};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Session document ID
    pub sid: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user resolved from the session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub session_id: String,
}

/// Middleware that requires a live session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = resolve_session(&state, &jar, request.headers())
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Look up the session behind a request, if any.
///
/// Returns `Ok(None)` for every flavor of "not logged in"; only store
/// failures are errors. Expired sessions are deleted on sight.
pub async fn resolve_session(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Result<Option<AuthUser>, AppError> {
    let Some(token) = token_from_request(jar, headers) else {
        return Ok(None);
    };

    let Some(claims) = decode_jwt(&token, &state.config.session_secret) else {
        tracing::debug!("Rejected session token with bad signature or expiry");
        return Ok(None);
    };

    let Some(session) = state.db.get_session(&claims.sid).await? else {
        return Ok(None);
    };

    if session.is_expired(Utc::now()) {
        tracing::debug!(user_id = %session.user_id, "Session expired");
        state.db.delete_session(&session.id).await?;
        return Ok(None);
    }

    if session.user_id != claims.sub {
        tracing::warn!(
            session_user = %session.user_id,
            token_user = %claims.sub,
            "Session does not belong to token subject"
        );
        return Ok(None);
    }

    let Some(user) = state.db.get_user(&claims.sub).await? else {
        return Ok(None);
    };

    Ok(Some(AuthUser {
        user,
        session_id: session.id,
    }))
}

/// Token from the session cookie, falling back to a bearer header.
pub fn token_from_request(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Create a session document for `user_id` and return its signed token.
pub async fn create_session(state: &AppState, user_id: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let session = Session::new(generate_session_id()?, user_id, now, SESSION_TTL_SECS);
    state.db.create_session(&session).await?;

    create_jwt(user_id, &session.id, &state.config.session_secret, now)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

/// 256 bits from the system CSPRNG, hex-encoded.
pub fn generate_session_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(hex::encode(bytes))
}

/// Create a JWT for a session.
pub fn create_jwt(
    user_id: &str,
    session_id: &str,
    signing_key: &[u8],
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let iat = now.timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        sid: session_id.to_string(),
        iat,
        exp: iat + SESSION_TTL_SECS as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Verify a JWT, returning its claims if the signature and expiry hold.
pub fn decode_jwt(token: &str, signing_key: &[u8]) -> Option<Claims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// The `Set-Cookie` value for a fresh session.
pub fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    let mut cookie = base_cookie(config, token);
    cookie.set_max_age(time::Duration::seconds(SESSION_TTL_SECS));
    cookie
}

/// A cookie that clears the session cookie with matching attributes.
pub fn removal_cookie(config: &Config) -> Cookie<'static> {
    let mut cookie = base_cookie(config, String::new());
    cookie.make_removal();
    cookie
}

fn base_cookie(config: &Config, value: String) -> Cookie<'static> {
    let same_site = if config.cookie_secure {
        SameSite::None
    } else {
        SameSite::Lax
    };

    let mut cookie = Cookie::build((SESSION_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(same_site)
        .build();

    if let Some(domain) = &config.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}
