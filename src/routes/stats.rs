// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public membership statistics for the landing page.

use crate::error::Result;
use crate::models::UserStatsResponse;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/user-stats", get(get_user_stats))
}

/// Premium member count and the most recent purchasers' avatars.
async fn get_user_stats(State(state): State<Arc<AppState>>) -> Result<Json<UserStatsResponse>> {
    let premium_users = state.db.list_premium_users().await?;
    Ok(Json(UserStatsResponse::from_premium_users(&premium_users)))
}
