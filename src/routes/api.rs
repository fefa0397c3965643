// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::course::default_catalogue;
use crate::models::{
    ContentUpdate, CourseContent, DashboardStats, Lesson, Location, ProgressSummary,
    ProgressUpdate, UserProgress,
};
use crate::routes::SuccessResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// API routes (require an authenticated session).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/course-content", get(get_course_content))
        .route("/update-content/{id}", put(update_content))
        .route("/update-progress", post(update_progress))
        .route("/user-progress", get(get_user_progress))
        .route("/update-location", post(update_location))
        .route("/dashboard-stats", get(get_dashboard_stats))
}

// ─── Course Content ──────────────────────────────────────────

/// Lesson list. Video URLs are only included for premium members and the admin.
async fn get_course_content(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Lesson>>> {
    let mut lessons = state.db.list_course_content().await?;

    if lessons.is_empty() {
        let catalogue = default_catalogue(Utc::now());
        tracing::info!(count = catalogue.len(), "Seeding default course content");
        state.db.insert_course_content(&catalogue).await?;
        lessons = catalogue;
    }

    let unlocked = auth.user.is_premium() || state.config.is_admin(auth.user.email.as_deref());

    Ok(Json(
        lessons.iter().map(|c| c.to_lesson(unlocked)).collect(),
    ))
}

#[derive(Serialize)]
pub struct UpdateContentResponse {
    pub success: bool,
    pub content: CourseContent,
}

/// Admin-only partial edit of one lesson.
async fn update_content(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(update): Json<ContentUpdate>,
) -> Result<Json<UpdateContentResponse>> {
    if !state.config.is_admin(auth.user.email.as_deref()) {
        tracing::warn!(user_id = %auth.user.id, lesson_id = %id, "Non-admin attempted content update");
        return Err(AppError::Unauthorized);
    }

    update.validate()?;

    let content = state
        .db
        .update_course_content(&id, update, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lesson {} not found", id)))?;

    tracing::info!(lesson_id = %id, "Course content updated");

    Ok(Json(UpdateContentResponse {
        success: true,
        content,
    }))
}

// ─── Progress ────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UpdateProgressResponse {
    pub success: bool,
    pub progress: UserProgress,
}

/// Record a progress ping. The latest ping wins, even if it went backwards.
async fn update_progress(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<UpdateProgressResponse>> {
    update.validate()?;
    if !update.duration.is_finite() || !update.watched_duration.is_finite() {
        return Err(AppError::BadRequest(
            "Durations must be finite numbers".to_string(),
        ));
    }

    let progress = update.into_record(&auth.user.id, Utc::now());
    state.db.upsert_progress(&progress).await?;

    tracing::debug!(
        user_id = %auth.user.id,
        video_id = %progress.video_id,
        watched = progress.watched_duration,
        completed = progress.completed,
        "Progress updated"
    );

    Ok(Json(UpdateProgressResponse {
        success: true,
        progress,
    }))
}

/// Totals and per-video maps of the caller's progress.
async fn get_user_progress(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProgressSummary>> {
    let records = state.db.list_progress(&auth.user.id).await?;
    Ok(Json(ProgressSummary::from_records(&records)))
}

// ─── Location ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct Coordinates {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(nested)]
    pub coordinates: Coordinates,
}

/// Store the browser's reported position on the caller's profile.
async fn update_location(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<SuccessResponse>> {
    request.validate()?;

    let location = Location {
        lat: request.coordinates.latitude,
        lng: request.coordinates.longitude,
        updated_at: Utc::now(),
    };

    if !state.db.set_user_location(&auth.user.id, &location).await? {
        return Err(AppError::NotFound(format!("User {} not found", auth.user.id)));
    }

    Ok(Json(SuccessResponse { success: true }))
}

// ─── Dashboard ───────────────────────────────────────────────

/// Member, revenue and visitor figures for the dashboard.
async fn get_dashboard_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>> {
    let premium_users = state.db.list_premium_users().await?;
    let total_visitors = state.db.count_users().await?;

    Ok(Json(DashboardStats::compute(
        &premium_users,
        total_visitors,
        Utc::now(),
    )))
}
