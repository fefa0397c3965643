// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. Secrets may come from a local `.env`
//! file during development or from secret bindings in production.

use std::env;

/// Price of the premium plan in US cents.
pub const PREMIUM_PRICE_CENTS: u64 = 2999;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "course_session";

/// Lifetime of a login session (24 hours).
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Where documents are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Frontend URL used for OAuth and checkout redirects
    pub client_url: String,
    /// Public base URL of this API (used to build the OAuth callback URL)
    pub api_url: String,
    /// Origins allowed to make credentialed CORS requests
    pub allowed_origins: Vec<String>,
    /// Email address allowed to edit course content
    pub admin_email: Option<String>,
    /// Server port
    pub port: u16,
    /// Optional `Domain` attribute for the session cookie
    pub cookie_domain: Option<String>,
    /// Mark the session cookie `Secure; SameSite=None`
    pub cookie_secure: bool,
    /// Document store selection
    pub storage_backend: StorageBackend,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,

    // --- Outbound endpoints (overridable for tests) ---
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_userinfo_url: String,
    pub stripe_api_url: String,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Signing key for session cookies and OAuth state (raw bytes)
    pub session_secret: Vec<u8>,
    /// Stripe secret API key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret (`whsec_...`)
    pub stripe_webhook_secret: String,
}

impl Config {
    /// Config for tests: in-memory storage, insecure cookies, fixed secrets.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            client_url: "http://localhost:3000".to_string(),
            api_url: "http://localhost:8000".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_email: Some("admin@example.com".to_string()),
            port: 8000,
            cookie_domain: None,
            cookie_secure: false,
            storage_backend: StorageBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            google_auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            google_userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            stripe_api_url: "https://api.stripe.com/v1".to_string(),
            google_client_secret: "test_google_secret".to_string(),
            session_secret: b"test_session_key_32_bytes_min!!!".to_vec(),
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let client_url = env::var("CLIENT_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let allowed_origins = match env::var("ALLOWED_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => vec![client_url.clone()],
        };

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse()?;

        let session_secret = required("SESSION_SECRET")?.into_bytes();
        if session_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET",
                "must be at least 32 bytes".to_string(),
            ));
        }

        Ok(Self {
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            client_url,
            api_url: env::var("API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            allowed_origins,
            admin_email: env::var("ADMIN_EMAIL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            cookie_domain: env::var("COOKIE_DOMAIN").ok().filter(|v| !v.is_empty()),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            storage_backend,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            google_auth_url: env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".to_string()),
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            google_userinfo_url: env::var("GOOGLE_USERINFO_URL").unwrap_or_else(|_| {
                "https://openidconnect.googleapis.com/v1/userinfo".to_string()
            }),
            stripe_api_url: env::var("STRIPE_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string()),
            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            session_secret,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        })
    }

    /// OAuth redirect URI registered with Google.
    pub fn google_callback_url(&self) -> String {
        format!("{}/auth/google/callback", self.api_url)
    }

    /// Whether `email` belongs to the content administrator.
    pub fn is_admin(&self, email: Option<&str>) -> bool {
        match (self.admin_email.as_deref(), email) {
            (Some(admin), Some(email)) => admin.eq_ignore_ascii_case(email),
            _ => false,
        }
    }

    /// Whether a browser origin may make credentialed requests.
    ///
    /// Configured origins match exactly. Plain-http localhost on any port is
    /// accepted only when cookies are not `Secure`, i.e. in development.
    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        if self.allowed_origins.iter().any(|o| o == origin) {
            return true;
        }
        !self.cookie_secure && is_loopback_origin(origin)
    }
}

/// `http://localhost[:port]` or `http://127.0.0.1[:port]` and nothing else.
fn is_loopback_origin(origin: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(origin) else {
        return false;
    };
    url.scheme() == "http"
        && matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"))
        && url.origin().ascii_serialization() == origin
}

/// Read a required secret, trimming stray whitespace from secret bindings.
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
