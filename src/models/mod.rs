// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod course;
pub mod progress;
pub mod session;
pub mod stats;
pub mod user;

pub use course::{ContentUpdate, CourseContent, Lesson};
pub use progress::{ProgressSummary, ProgressUpdate, UserProgress};
pub use session::Session;
pub use stats::{DashboardStats, UserStatsResponse};
pub use user::{Location, Plan, UpgradeOutcome, User};
