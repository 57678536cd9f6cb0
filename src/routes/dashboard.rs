// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Dashboard routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::routes::{ApiQuery, ApiResponse};
use crate::services::listing::UserDashboard;
use crate::services::{LeaderboardEntry, PlatformStats};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Platform totals, readable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/dashboard/stats", get(platform_stats))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard/user-stats", get(user_stats))
        .route("/api/dashboard/leaderboard", get(leaderboard))
}

async fn platform_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<PlatformStats>>> {
    let stats = state.listings.platform_stats().await?;
    Ok(ApiResponse::ok("Platform statistics retrieved", stats))
}

/// Impact totals, lifetime counters and achievements for the caller.
async fn user_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserDashboard>>> {
    let dashboard = state.listings.user_dashboard(&user.actor()).await?;
    Ok(ApiResponse::ok("User statistics retrieved", dashboard))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LeaderboardQuery {
    /// Defaults to 10.
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: Option<u32>,
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): ApiQuery<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>> {
    params.validate()?;
    let entries = state.listings.leaderboard(params.limit).await?;
    Ok(ApiResponse::ok("Leaderboard retrieved", entries))
}
