// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Volunteer routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Availability, ListingView, PickupWindow, UserProfile};
use crate::routes::{geo_filter, ApiJson, ApiQuery, ApiResponse};
use crate::services::{VolunteerMatch, VolunteerStats};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Volunteer routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/volunteers/nearby", get(nearby_volunteers))
        .route("/api/volunteers/match", post(match_volunteers))
        .route("/api/volunteers/opportunities", get(opportunities))
        .route("/api/volunteers/availability", put(update_availability))
        .route("/api/volunteers/{id}/stats", get(volunteer_stats))
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    /// Restrict to volunteers available on this window's weekday.
    pub pickup_start: Option<DateTime<Utc>>,
    pub pickup_end: Option<DateTime<Utc>>,
}

async fn nearby_volunteers(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): ApiQuery<NearbyQuery>,
) -> Result<Json<ApiResponse<Vec<VolunteerMatch>>>> {
    let near = geo_filter(params.lat, params.lng, params.radius)?
        .ok_or_else(|| AppError::validation("lat", "lat and lng are required"))?;

    let window = match (params.pickup_start, params.pickup_end) {
        (Some(start), Some(end)) => Some(PickupWindow { start, end }),
        (None, None) => None,
        _ => {
            return Err(AppError::validation(
                "pickup_window",
                "pickup_start and pickup_end must be supplied together",
            ))
        }
    };

    let volunteers = state.volunteers.nearby_volunteers(near, window).await?;
    Ok(ApiResponse::ok("Nearby volunteers retrieved", volunteers))
}

#[derive(Debug, Deserialize, Validate)]
pub struct MatchRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub listing_id: String,
    /// Defaults to 5, at most 50.
    pub max_volunteers: Option<usize>,
}

async fn match_volunteers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): ApiJson<MatchRequest>,
) -> Result<Json<ApiResponse<Vec<VolunteerMatch>>>> {
    req.validate()?;
    let matches = state
        .volunteers
        .match_volunteers(&req.listing_id, req.max_volunteers, &user.actor())
        .await?;
    Ok(ApiResponse::ok(
        format!("Found {} matching volunteers", matches.len()),
        matches,
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct OpportunitiesQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: Option<u32>,
}

async fn opportunities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(params), _): ApiQuery<OpportunitiesQuery>,
) -> Result<Json<ApiResponse<Vec<ListingView>>>> {
    params.validate()?;
    let near = geo_filter(params.lat, params.lng, params.radius)?;
    let listings = state
        .volunteers
        .opportunities(&user.actor(), near, params.limit)
        .await?;
    Ok(ApiResponse::ok("Volunteer opportunities retrieved", listings))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(availability), _): ApiJson<Availability>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let profile = state
        .volunteers
        .update_availability(&user.actor(), availability)
        .await?;
    Ok(ApiResponse::ok("Availability updated", profile))
}

/// Public counters for any volunteer; the volunteer themself also sees
/// recent pickups, achievements and availability.
async fn volunteer_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<VolunteerStats>>> {
    let stats = state.volunteers.volunteer_stats(&id, &user.actor()).await?;
    Ok(ApiResponse::ok("Volunteer statistics retrieved", stats))
}
