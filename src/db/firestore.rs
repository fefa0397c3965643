// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, plan, location)
//! - Sessions (server-side login sessions)
//! - Course content (lesson catalogue)
//! - User progress (one document per user and video)

use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::FirestoreConsistencySelector;
use futures_util::{stream, StreamExt};
use serde::Deserialize;

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    ContentUpdate, CourseContent, Location, Plan, Session, UpgradeOutcome, User, UserProgress,
};

const MAX_CONCURRENT_DB_OPS: usize = 50;
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

/// Result row of a `count()` aggregation.
#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

/// Whether Firestore reported an aborted or otherwise retryable transaction.
fn is_contention(e: &FirestoreError) -> bool {
    matches!(e, FirestoreError::DatabaseError(db) if db.retry_possible)
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(db_err)
    }

    /// Create or replace a user document.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Refresh the Google profile fields without touching plan or location.
    pub async fn update_profile(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(["displayName", "email", "profilePicture"])
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Store a location on an existing user. Returns `false` if the user is gone.
    pub async fn set_user_location(
        &self,
        user_id: &str,
        location: &Location,
    ) -> Result<bool, AppError> {
        let Some(mut user) = self.get_user(user_id).await? else {
            return Ok(false);
        };
        user.location = Some(location.clone());

        let _: () = self
            .client
            .fluent()
            .update()
            .fields(["location"])
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(true)
    }

    /// Move a user from basic to premium inside a transaction.
    ///
    /// A user who is already premium keeps the original purchase date.
    /// Contended transactions are retried, so a racing caller sees
    /// `AlreadyPremium` once the other commit lands.
    pub async fn upgrade_to_premium(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UpgradeOutcome, AppError> {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            match self.try_upgrade_to_premium(user_id, now).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if is_contention(&e) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::warn!(
                        user_id,
                        attempt,
                        error = %e,
                        "Upgrade transaction contended, retrying"
                    );
                }
                Err(e) => return Err(db_err(e)),
            }
        }
        Err(AppError::Database("Upgrade transaction retries exhausted".to_string()))
    }

    async fn try_upgrade_to_premium(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UpgradeOutcome, FirestoreError> {
        let mut transaction = self.client.begin_transaction().await?;

        // Reading through the transaction registers the document, so a
        // concurrent commit aborts this one instead of being overwritten.
        let current: Option<User> = self
            .client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await?;

        let Some(mut user) = current else {
            let _ = transaction.rollback().await;
            return Ok(UpgradeOutcome::UserNotFound);
        };

        if user.plan == Plan::Premium {
            let _ = transaction.rollback().await;
            return Ok(UpgradeOutcome::AlreadyPremium);
        }

        user.plan = Plan::Premium;
        user.purchase_date = Some(now);

        self.client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .add_to_transaction(&mut transaction)?;

        transaction.commit().await?;

        Ok(UpgradeOutcome::Upgraded)
    }

    pub async fn list_premium_users(&self) -> Result<Vec<User>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("plan").eq(Plan::Premium.as_str())]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Count user documents with a server-side aggregation.
    pub async fn count_users(&self) -> Result<u64, AppError> {
        let rows: Vec<CountRow> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        Ok(rows.first().map_or(0, |row| row.count))
    }

    // ─── Session Operations ──────────────────────────────────────

    pub async fn create_session(&self, session: &Session) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session.id)
            .object(session)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(session_id)
            .await
            .map_err(db_err)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::SESSIONS)
            .document_id(session_id)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ─── Course Content Operations ───────────────────────────────

    pub async fn list_course_content(&self) -> Result<Vec<CourseContent>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::COURSE_CONTENT)
            .order_by([("order", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Store multiple lessons.
    ///
    /// Uses concurrent writes with a limit to avoid overloading Firestore.
    pub async fn insert_course_content(&self, lessons: &[CourseContent]) -> Result<(), AppError> {
        let client = &self.client;

        stream::iter(lessons.to_vec())
            .map(|lesson| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::COURSE_CONTENT)
                    .document_id(&lesson.id)
                    .object(&lesson)
                    .execute()
                    .await
                    .map_err(db_err)?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    pub async fn update_course_content(
        &self,
        id: &str,
        update: ContentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<CourseContent>, AppError> {
        let current: Option<CourseContent> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::COURSE_CONTENT)
            .obj()
            .one(id)
            .await
            .map_err(db_err)?;

        let Some(mut content) = current else {
            return Ok(None);
        };
        update.apply(&mut content, now);

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::COURSE_CONTENT)
            .document_id(id)
            .object(&content)
            .execute()
            .await
            .map_err(db_err)?;

        Ok(Some(content))
    }

    // ─── Progress Operations ─────────────────────────────────────

    /// Create or overwrite the progress document for (user, video).
    pub async fn upsert_progress(&self, progress: &UserProgress) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USER_PROGRESS)
            .document_id(progress.doc_id())
            .object(progress)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn list_progress(&self, user_id: &str) -> Result<Vec<UserProgress>, AppError> {
        let user_id = user_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::USER_PROGRESS)
            .filter(move |q| q.for_all([q.field("userId").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }
}
