// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side login sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session record stored in the `sessions` collection, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, user_id: &str, now: DateTime<Utc>, ttl_secs: i64) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
