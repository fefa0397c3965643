// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user video watch progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Progress record stored in `user_progress`.
///
/// One document per (user, video); see [`UserProgress::doc_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProgress {
    pub user_id: String,
    pub video_id: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub watched_duration: f64,
    #[serde(default)]
    pub completed: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub last_watched: DateTime<Utc>,
}

impl UserProgress {
    /// Document ID for a (user, video) pair.
    pub fn doc_id_for(user_id: &str, video_id: &str) -> String {
        format!("{}_{}", user_id, urlencoding::encode(video_id))
    }

    pub fn doc_id(&self) -> String {
        Self::doc_id_for(&self.user_id, &self.video_id)
    }
}

/// Progress ping from the video player.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[validate(length(min = 1, max = 64))]
    pub video_id: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub duration: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub watched_duration: f64,
    #[serde(default)]
    pub completed: bool,
}

impl ProgressUpdate {
    /// Full replacement record for this ping. Later pings overwrite earlier ones.
    pub fn into_record(self, user_id: &str, now: DateTime<Utc>) -> UserProgress {
        UserProgress {
            user_id: user_id.to_string(),
            video_id: self.video_id,
            duration: self.duration,
            watched_duration: self.watched_duration,
            completed: self.completed,
            last_watched: now,
        }
    }
}

/// Aggregated progress across all of a user's videos.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProgressSummary {
    pub total_duration: f64,
    pub watched_duration: f64,
    pub durations: BTreeMap<String, f64>,
    pub watched_durations: BTreeMap<String, f64>,
    pub completed: BTreeMap<String, bool>,
}

impl ProgressSummary {
    pub fn from_records(records: &[UserProgress]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary
                .durations
                .insert(record.video_id.clone(), record.duration);
            summary
                .watched_durations
                .insert(record.video_id.clone(), record.watched_duration);
            summary
                .completed
                .insert(record.video_id.clone(), record.completed);
        }
        summary.total_duration = summary.durations.values().sum();
        summary.watched_duration = summary.watched_durations.values().sum();
        summary
    }
}
