// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, or in-memory for tests and local runs).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use chrono::{DateTime, Utc};

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::{
    ContentUpdate, CourseContent, Location, Session, UpgradeOutcome, User, UserProgress,
};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SESSIONS: &str = "sessions";
    pub const COURSE_CONTENT: &str = "course_content";
    pub const USER_PROGRESS: &str = "user_progress";
}

/// Document store used by the handlers.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

impl Database {
    /// Connect to the backend selected in the config.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.storage_backend {
            StorageBackend::Firestore => Ok(Self::Firestore(
                FirestoreDb::new(&config.gcp_project_id).await?,
            )),
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data will not survive a restart");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::Memory(MemoryDb::new())
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match self {
            Self::Firestore(db) => db.get_user(user_id).await,
            Self::Memory(db) => Ok(db.get_user(user_id)),
        }
    }

    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.upsert_user(user).await,
            Self::Memory(db) => {
                db.upsert_user(user);
                Ok(())
            }
        }
    }

    /// Overwrite display name, email and picture only.
    pub async fn update_profile(&self, user: &User) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.update_profile(user).await,
            Self::Memory(db) => {
                db.update_profile(user);
                Ok(())
            }
        }
    }

    pub async fn set_user_location(
        &self,
        user_id: &str,
        location: &Location,
    ) -> Result<bool, AppError> {
        match self {
            Self::Firestore(db) => db.set_user_location(user_id, location).await,
            Self::Memory(db) => Ok(db.set_user_location(user_id, location)),
        }
    }

    /// The only path that changes a user's plan.
    pub async fn upgrade_to_premium(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UpgradeOutcome, AppError> {
        match self {
            Self::Firestore(db) => db.upgrade_to_premium(user_id, now).await,
            Self::Memory(db) => Ok(db.upgrade_to_premium(user_id, now)),
        }
    }

    pub async fn list_premium_users(&self) -> Result<Vec<User>, AppError> {
        match self {
            Self::Firestore(db) => db.list_premium_users().await,
            Self::Memory(db) => Ok(db.list_premium_users()),
        }
    }

    pub async fn count_users(&self) -> Result<u64, AppError> {
        match self {
            Self::Firestore(db) => db.count_users().await,
            Self::Memory(db) => Ok(db.count_users()),
        }
    }

    // ─── Sessions ────────────────────────────────────────────────

    pub async fn create_session(&self, session: &Session) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.create_session(session).await,
            Self::Memory(db) => {
                db.create_session(session);
                Ok(())
            }
        }
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        match self {
            Self::Firestore(db) => db.get_session(session_id).await,
            Self::Memory(db) => Ok(db.get_session(session_id)),
        }
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.delete_session(session_id).await,
            Self::Memory(db) => {
                db.delete_session(session_id);
                Ok(())
            }
        }
    }

    // ─── Course content ──────────────────────────────────────────

    /// Lessons sorted by `order`.
    pub async fn list_course_content(&self) -> Result<Vec<CourseContent>, AppError> {
        match self {
            Self::Firestore(db) => db.list_course_content().await,
            Self::Memory(db) => Ok(db.list_course_content()),
        }
    }

    pub async fn insert_course_content(&self, lessons: &[CourseContent]) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.insert_course_content(lessons).await,
            Self::Memory(db) => {
                db.insert_course_content(lessons);
                Ok(())
            }
        }
    }

    /// Returns `None` if no lesson has this ID.
    pub async fn update_course_content(
        &self,
        id: &str,
        update: ContentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<CourseContent>, AppError> {
        match self {
            Self::Firestore(db) => db.update_course_content(id, update, now).await,
            Self::Memory(db) => Ok(db.update_course_content(id, update, now)),
        }
    }

    // ─── Progress ────────────────────────────────────────────────

    pub async fn upsert_progress(&self, progress: &UserProgress) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.upsert_progress(progress).await,
            Self::Memory(db) => {
                db.upsert_progress(progress);
                Ok(())
            }
        }
    }

    pub async fn list_progress(&self, user_id: &str) -> Result<Vec<UserProgress>, AppError> {
        match self {
            Self::Firestore(db) => db.list_progress(user_id).await,
            Self::Memory(db) => Ok(db.list_progress(user_id)),
        }
    }
}
