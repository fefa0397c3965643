// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Subscription tier of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Plan {
    #[default]
    Basic,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Premium => "premium",
        }
    }
}

/// Last known browser location of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// User profile stored in the `users` collection.
///
/// The document ID is the Google subject ID, which makes `google_id` unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    pub id: String,
    pub google_id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub location: Option<Location>,
    /// Set once, on the basic → premium transition
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub purchase_date: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A fresh basic-plan user from a Google profile.
    pub fn new_basic(
        google_id: &str,
        display_name: String,
        email: Option<String>,
        profile_picture: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: google_id.to_string(),
            google_id: google_id.to_string(),
            display_name,
            email,
            profile_picture,
            plan: Plan::Basic,
            location: None,
            purchase_date: None,
            created_at: now,
        }
    }

    pub fn is_premium(&self) -> bool {
        self.plan == Plan::Premium
    }
}

/// Result of an attempted plan upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The user moved from basic to premium.
    Upgraded,
    /// The user was already premium; nothing was written.
    AlreadyPremium,
    UserNotFound,
}
