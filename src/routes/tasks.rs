// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Maintenance task routes.
//!
//! These endpoints are called by the scheduler, not directly by users.
//! `require_tasks_auth` guards them (applied in routes/mod.rs).

use crate::error::Result;
use crate::routes::ApiResponse;
use crate::services::SweepReport;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

/// Task handler routes (called by the scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/expire-listings", post(expire_listings))
}

/// Expire every available listing past its expiry date.
///
/// Safe to call repeatedly: already-expired listings are not touched again.
async fn expire_listings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SweepReport>>> {
    tracing::info!("Expiry sweep requested by scheduler");
    let report = state.listings.expire_listings().await?;
    Ok(ApiResponse::ok(
        format!("Expired {} listings", report.expired.len()),
        report,
    ))
}
