// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Listing routes: browsing, search, the live event stream, and the
//! owner/volunteer operations that drive the listing lifecycle.

use crate::db::{SortDirection, SortField};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::listing::Allergen;
use crate::models::{
    FoodCategory, Listing, ListingEdit, ListingStatus, Location, NewListing, PickupWindow,
};
use crate::routes::{geo_filter, ApiJson, ApiQuery, ApiResponse};
use crate::services::listing::{ListingAnalytics, ListingDetail, ListingPage};
use crate::services::ListingSearch;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use validator::Validate;

/// Routes readable without a token.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/listings", get(get_listings))
        .route("/api/listings/search", get(search_listings))
        .route("/api/listings/expiring", get(expiring_listings))
        .route("/api/listings/events", get(listing_events))
        .route("/api/listings/{id}", get(get_listing))
}

/// Routes that require a JWT. The auth middleware is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/listings", post(create_listing))
        .route(
            "/api/listings/{id}",
            put(update_listing).delete(delete_listing),
        )
        .route("/api/listings/{id}/claim", post(claim_listing))
        .route("/api/listings/{id}/status", put(update_status))
        .route("/api/listings/{id}/analytics", get(listing_analytics))
        .route("/api/listings/user/{user_id}", get(listings_by_user))
}

// ─── Browse ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListingsQuery {
    pub status: Option<ListingStatus>,
    pub category: Option<FoodCategory>,
    pub owner_id: Option<String>,
    pub volunteer_id: Option<String>,
    pub sort: Option<SortField>,
    pub direction: Option<SortDirection>,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

/// List active listings (available by default), optionally near a point.
async fn get_listings(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): ApiQuery<ListingsQuery>,
) -> Result<Json<ApiResponse<ListingPage>>> {
    params.validate()?;
    let near = geo_filter(params.lat, params.lng, params.radius)?;

    let page = state
        .listings
        .get_listings(ListingSearch {
            status: params.status,
            category: params.category,
            owner_id: params.owner_id,
            volunteer_id: params.volunteer_id,
            sort: params.sort.unwrap_or_default(),
            direction: params.direction.unwrap_or_default(),
            limit: params.limit,
            offset: params.offset,
            near,
        })
        .await?;

    Ok(ApiResponse::ok("Listings retrieved", page))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub category: Option<FoodCategory>,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: Option<u32>,
}

async fn search_listings(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<Listing>>>> {
    params.validate()?;
    let listings = state
        .listings
        .search_listings(&params.q, params.category, params.limit)
        .await?;
    Ok(ApiResponse::ok("Search completed", listings))
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub hours: Option<i64>,
}

async fn expiring_listings(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): ApiQuery<ExpiringQuery>,
) -> Result<Json<ApiResponse<Vec<Listing>>>> {
    let listings = state.listings.expiring_listings(params.hours).await?;
    Ok(ApiResponse::ok("Expiring listings retrieved", listings))
}

/// Fetch one listing. Counts as a view.
async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ListingDetail>>> {
    let detail = state.listings.get_listing(&id).await?;
    Ok(ApiResponse::ok("Listing retrieved", detail))
}

// ─── Live events ─────────────────────────────────────────────

/// Server-Sent Events feed of committed listing changes.
///
/// Sends `connected` first, then one event per [`crate::services::ListingEvent`]
/// named after its `type`. A slow client that falls behind receives a
/// `lagged` event with the number of missed events.
async fn listing_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    tracing::debug!(
        subscribers = state.events.receiver_count(),
        "Listing event stream opened"
    );

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => Event::default()
                .event(event.name())
                .json_data(&event)
                .ok()
                .map(Ok),
            Err(BroadcastStreamRecvError::Lagged(missed)) => Event::default()
                .event("lagged")
                .json_data(serde_json::json!({ "missed": missed }))
                .ok()
                .map(Ok),
        }
    });

    Sse::new(connected.chain(events)).keep_alive(KeepAlive::default())
}

// ─── Create / Edit ───────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    #[validate(length(min = 5, max = 100, message = "must be between 5 and 100 characters"))]
    pub title: String,
    #[validate(length(
        min = 10,
        max = 1000,
        message = "must be between 10 and 1000 characters"
    ))]
    pub description: String,
    pub category: FoodCategory,
    pub quantity: f64,
    #[validate(length(min = 1, max = 20, message = "must be between 1 and 20 characters"))]
    pub unit: String,
    pub location: Location,
    pub expiry_date: DateTime<Utc>,
    pub pickup_window: PickupWindow,
    #[serde(default)]
    pub allergens: BTreeSet<Allergen>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub special_instructions: Option<String>,
}

impl From<CreateListingRequest> for NewListing {
    fn from(req: CreateListingRequest) -> Self {
        NewListing {
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            category: req.category,
            quantity: req.quantity,
            unit: req.unit.trim().to_string(),
            location: req.location,
            expiry_date: req.expiry_date,
            pickup_window: req.pickup_window,
            allergens: req.allergens,
            special_instructions: req.special_instructions,
        }
    }
}

async fn create_listing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): ApiJson<CreateListingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Listing>>)> {
    req.validate()?;
    let listing = state
        .listings
        .create_listing(req.into(), &user.actor())
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Listing created successfully", listing),
    ))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateListingRequest {
    #[validate(length(min = 5, max = 100, message = "must be between 5 and 100 characters"))]
    pub title: Option<String>,
    #[validate(length(
        min = 10,
        max = 1000,
        message = "must be between 10 and 1000 characters"
    ))]
    pub description: Option<String>,
    pub quantity: Option<f64>,
    #[validate(length(min = 1, max = 20, message = "must be between 1 and 20 characters"))]
    pub unit: Option<String>,
    pub location: Option<Location>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub pickup_window: Option<PickupWindow>,
    pub allergens: Option<BTreeSet<Allergen>>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub special_instructions: Option<String>,
}

impl From<UpdateListingRequest> for ListingEdit {
    fn from(req: UpdateListingRequest) -> Self {
        ListingEdit {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description.map(|d| d.trim().to_string()),
            quantity: req.quantity,
            unit: req.unit.map(|u| u.trim().to_string()),
            location: req.location,
            expiry_date: req.expiry_date,
            pickup_window: req.pickup_window,
            allergens: req.allergens,
            special_instructions: req.special_instructions,
        }
    }
}

async fn update_listing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): ApiJson<UpdateListingRequest>,
) -> Result<Json<ApiResponse<Listing>>> {
    req.validate()?;
    let listing = state
        .listings
        .update_listing(&id, req.into(), &user.actor())
        .await?;
    Ok(ApiResponse::ok("Listing updated successfully", listing))
}

async fn delete_listing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    state.listings.delete_listing(&id, &user.actor()).await?;
    Ok(ApiResponse::ok("Listing deleted successfully", ()))
}

// ─── Lifecycle ───────────────────────────────────────────────

async fn claim_listing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Listing>>> {
    let listing = state.listings.claim_listing(&id, &user.actor()).await?;
    Ok(ApiResponse::ok("Listing claimed successfully", listing))
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    pub status: ListingStatus,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub reason: Option<String>,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): ApiJson<StatusUpdateRequest>,
) -> Result<Json<ApiResponse<Listing>>> {
    req.validate()?;
    let listing = state
        .listings
        .update_listing_status(&id, req.status, &user.actor(), req.reason)
        .await?;
    Ok(ApiResponse::ok("Listing status updated", listing))
}

// ─── Owner views ─────────────────────────────────────────────

async fn listing_analytics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ListingAnalytics>>> {
    let analytics = state
        .listings
        .listing_analytics(&id, &user.actor())
        .await?;
    Ok(ApiResponse::ok("Listing analytics retrieved", analytics))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserListingsQuery {
    pub status: Option<ListingStatus>,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

async fn listings_by_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    WithRejection(Query(params), _): ApiQuery<UserListingsQuery>,
) -> Result<Json<ApiResponse<ListingPage>>> {
    params.validate()?;
    let page = state
        .listings
        .listings_by_user(
            &user_id,
            params.status,
            params.limit,
            params.offset,
            &user.actor(),
        )
        .await?;
    Ok(ApiResponse::ok("User listings retrieved", page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_length_rules() {
        let req: CreateListingRequest = serde_json::from_value(serde_json::json!({
            "title": "Soup",
            "description": "Ten litres of vegetable soup",
            "category": "prepared",
            "quantity": 10.0,
            "unit": "liters",
            "location": { "latitude": 40.0, "longitude": -74.0 },
            "expiry_date": "2030-01-02T00:00:00Z",
            "pickup_window": {
                "start": "2030-01-01T10:00:00Z",
                "end": "2030-01-01T12:00:00Z"
            }
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(!errors.field_errors().contains_key("description"));
    }

    #[test]
    fn test_update_request_trims_into_edit() {
        let req = UpdateListingRequest {
            title: Some("  Fresh bread loaves ".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());

        let edit: ListingEdit = req.into();
        assert_eq!(edit.title.as_deref(), Some("Fresh bread loaves"));
        assert!(edit.description.is_none());
    }
}
