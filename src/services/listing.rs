// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Listing use cases exposed to the API layer.
//!
//! Each operation validates its input, performs the primary write through the
//! store or the lifecycle, then runs post-commit hooks. Hook failures never
//! change the reported outcome.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::hooks::{CommitEffect, ListingEvent, PostCommitHooks};
use super::impact::{impact_score, ImpactEstimate, PlatformStats, UserImpactSummary};
use super::lifecycle::{Actor, LifecycleEvent, ListingLifecycle, SweepReport, TransitionOutcome};
use super::matcher::rank_by_distance;
use crate::config::Config;
use crate::db::{
    ListingFilter, ListingPatch, ListingQuery, ListingStore, Precondition, SortDirection,
    SortField, UserDirectory, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use crate::error::{AppError, Result};
use crate::models::location::{round_km, valid_coordinates};
use crate::models::user::{achievements, Achievement};
use crate::models::{
    FoodCategory, Listing, ListingEdit, ListingStatus, ListingView, NewListing, PickupWindow,
    StatsDelta, UserProfile, UserStats,
};
use crate::time_utils::Clock;

/// Minimum length of a search term.
pub const MIN_SEARCH_TERM_LEN: usize = 2;
pub const DEFAULT_EXPIRING_HOURS: i64 = 2;
pub const MAX_EXPIRING_HOURS: i64 = 168;

/// Distance settings shared by the listing and volunteer services.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchLimits {
    pub default_search_radius_km: f64,
    pub match_radius_km: f64,
    pub max_delivery_distance_km: f64,
}

impl From<&Config> for SearchLimits {
    fn from(config: &Config) -> Self {
        Self {
            default_search_radius_km: config.default_search_radius_km,
            match_radius_km: config.match_radius_km,
            max_delivery_distance_km: config.max_delivery_distance_km,
        }
    }
}

impl SearchLimits {
    /// Resolve and check a client-supplied radius.
    pub fn radius(&self, requested: Option<f64>) -> Result<f64> {
        let radius = requested.unwrap_or(self.default_search_radius_km);
        if !radius.is_finite() || radius <= 0.0 || radius > self.max_delivery_distance_km {
            return Err(AppError::validation(
                "radius",
                format!(
                    "must be greater than 0 and at most {} km",
                    self.max_delivery_distance_km
                ),
            ));
        }
        Ok(radius)
    }
}

/// Origin for distance filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
}

impl GeoFilter {
    pub fn validate(&self) -> Result<()> {
        if !valid_coordinates(self.latitude, self.longitude) {
            return Err(AppError::validation(
                "latitude",
                "coordinates must be a valid latitude/longitude pair",
            ));
        }
        Ok(())
    }
}

/// Filters, sort and page for [`ListingService::get_listings`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingSearch {
    /// Defaults to `available`.
    pub status: Option<ListingStatus>,
    pub category: Option<FoodCategory>,
    pub owner_id: Option<String>,
    pub volunteer_id: Option<String>,
    pub sort: SortField,
    pub direction: SortDirection,
    pub limit: Option<u32>,
    pub offset: u32,
    pub near: Option<GeoFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    /// The store returned a full page. With a distance filter the page may
    /// hold fewer than `limit` listings even when this is true.
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub listings: Vec<ListingView>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<UserProfile> for UserSummary {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
        }
    }
}

/// Listing with its owner's public profile.
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserSummary>,
}

/// Owner-facing numbers for one listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingAnalytics {
    pub listing_id: String,
    pub views: u64,
    pub claims: u64,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub impact_score: u64,
    pub impact: ImpactEstimate,
}

/// Dashboard payload for the signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct UserDashboard {
    pub summary: UserImpactSummary,
    /// Counters maintained by lifecycle side effects.
    pub stats: UserStats,
    pub achievements: Vec<Achievement>,
}

/// One row of the impact leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub impact_score: u64,
    pub total_listings: u64,
    pub total_pickups: u64,
    pub total_deliveries: u64,
}

impl From<UserProfile> for LeaderboardEntry {
    fn from(profile: UserProfile) -> Self {
        Self {
            name: format!("{} {}", profile.first_name, profile.last_name),
            impact_score: profile.stats.impact_score,
            total_listings: profile.stats.total_listings,
            total_pickups: profile.stats.total_pickups,
            total_deliveries: profile.stats.total_deliveries,
            id: profile.id,
        }
    }
}

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Clamp a requested page size to `1..=MAX_PAGE_LIMIT`.
pub fn page_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT)
}

/// Listing orchestration.
#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn ListingStore>,
    directory: Arc<dyn UserDirectory>,
    lifecycle: ListingLifecycle,
    hooks: PostCommitHooks,
    clock: Arc<dyn Clock>,
    limits: SearchLimits,
}

impl ListingService {
    pub fn new(
        store: Arc<dyn ListingStore>,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        hooks: PostCommitHooks,
        limits: SearchLimits,
    ) -> Self {
        let lifecycle = ListingLifecycle::new(store.clone(), clock.clone());
        Self {
            store,
            directory,
            lifecycle,
            hooks,
            clock,
            limits,
        }
    }

    async fn finish(&self, outcome: TransitionOutcome) -> Listing {
        self.hooks.run(&outcome.effects).await;
        outcome.listing
    }

    async fn load_active(&self, id: &str) -> Result<Listing> {
        self.store
            .get_by_id(id)
            .await?
            .filter(|listing| listing.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Listing {}", id)))
    }

    // ─── Create / Read ───────────────────────────────────────

    pub async fn create_listing(&self, input: NewListing, actor: &Actor) -> Result<Listing> {
        let owner_id = actor
            .user_id()
            .ok_or_else(|| AppError::Unauthorized("Only users can create listings".to_string()))?
            .to_string();
        let now = self.clock.now();
        validate_new_listing(&input, now)?;

        let listing = self.store.create(input, &owner_id, now).await?;
        tracing::info!(
            listing_id = %listing.id,
            owner_id = %owner_id,
            category = %listing.category,
            "Listing created"
        );

        self.hooks
            .run(&[
                CommitEffect::Stats {
                    user_id: owner_id,
                    delta: StatsDelta::listing_created(),
                },
                CommitEffect::Event(ListingEvent::NewListing {
                    listing: Box::new(listing.clone()),
                }),
            ])
            .await;
        Ok(listing)
    }

    /// Fetch one listing with its owner, counting the view.
    pub async fn get_listing(&self, id: &str) -> Result<ListingDetail> {
        let listing = self.load_active(id).await?;

        if let Err(e) = self.store.increment_view_count(id).await {
            tracing::warn!(listing_id = id, error = %e, "Failed to increment view count");
        }

        let owner = match self.directory.get_by_id(&listing.owner_id).await {
            Ok(profile) => profile.map(UserSummary::from),
            Err(e) => {
                tracing::warn!(listing_id = id, error = %e, "Failed to load listing owner");
                None
            }
        };

        Ok(ListingDetail { listing, owner })
    }

    /// Filtered, sorted page of active listings.
    ///
    /// The distance filter runs over the fetched page, so a geo query can
    /// return fewer than `limit` results while more matching listings exist
    /// further down.
    pub async fn get_listings(&self, search: ListingSearch) -> Result<ListingPage> {
        let radius = match &search.near {
            Some(near) => {
                near.validate()?;
                Some(self.limits.radius(near.radius_km)?)
            }
            None => None,
        };
        let limit = page_limit(search.limit);

        let filter = ListingFilter {
            active: Some(true),
            status: Some(search.status.unwrap_or(ListingStatus::Available)),
            category: search.category,
            owner_id: search.owner_id,
            volunteer_id: search.volunteer_id,
        };
        let query = ListingQuery::new(filter)
            .sorted(search.sort, search.direction)
            .page(limit, search.offset);
        let page = self.store.query(&query).await?;
        let has_more = page.len() == limit as usize;

        let listings = match (search.near, radius) {
            (Some(near), Some(radius)) => with_distances(near.latitude, near.longitude, radius, page),
            _ => page.into_iter().map(ListingView::from).collect(),
        };

        Ok(ListingPage {
            listings,
            pagination: Pagination {
                limit,
                offset: search.offset,
                has_more,
            },
        })
    }

    /// Case-insensitive substring search over available listings.
    pub async fn search_listings(
        &self,
        term: &str,
        category: Option<FoodCategory>,
        limit: Option<u32>,
    ) -> Result<Vec<Listing>> {
        let term = term.trim().to_lowercase();
        if term.chars().count() < MIN_SEARCH_TERM_LEN {
            return Err(AppError::validation(
                "q",
                format!("must be at least {} characters", MIN_SEARCH_TERM_LEN),
            ));
        }

        let filter = ListingFilter {
            category,
            ..ListingFilter::available()
        };
        let candidates = self.store.query(&ListingQuery::new(filter)).await?;
        Ok(candidates
            .into_iter()
            .filter(|listing| listing.matches_term(&term))
            .take(page_limit(limit) as usize)
            .collect())
    }

    /// Available listings expiring within `hours`, soonest first.
    pub async fn expiring_listings(&self, hours: Option<i64>) -> Result<Vec<Listing>> {
        let hours = hours.unwrap_or(DEFAULT_EXPIRING_HOURS);
        if !(1..=MAX_EXPIRING_HOURS).contains(&hours) {
            return Err(AppError::validation(
                "hours",
                format!("must be between 1 and {}", MAX_EXPIRING_HOURS),
            ));
        }
        let cutoff = self.clock.now() + Duration::hours(hours);

        let query = ListingQuery::new(ListingFilter::available())
            .sorted(SortField::ExpiryDate, SortDirection::Asc);
        let listings = self.store.query(&query).await?;
        Ok(listings
            .into_iter()
            .filter(|listing| listing.expiry_date <= cutoff)
            .collect())
    }

    /// Listings owned by `user_id`. Visible to that user and to admins.
    pub async fn listings_by_user(
        &self,
        user_id: &str,
        status: Option<ListingStatus>,
        limit: Option<u32>,
        offset: u32,
        actor: &Actor,
    ) -> Result<ListingPage> {
        if actor.user_id() != Some(user_id) && !actor.is_admin() {
            return Err(AppError::Unauthorized(
                "Cannot view another user's listings".to_string(),
            ));
        }
        let limit = page_limit(limit);
        let filter = ListingFilter {
            active: Some(true),
            status,
            owner_id: Some(user_id.to_string()),
            ..Default::default()
        };
        let page = self
            .store
            .query(&ListingQuery::new(filter).page(limit, offset))
            .await?;
        let has_more = page.len() == limit as usize;

        Ok(ListingPage {
            listings: page.into_iter().map(ListingView::from).collect(),
            pagination: Pagination {
                limit,
                offset,
                has_more,
            },
        })
    }

    pub async fn listing_analytics(&self, id: &str, actor: &Actor) -> Result<ListingAnalytics> {
        let listing = self.load_active(id).await?;
        if actor.user_id() != Some(listing.owner_id.as_str()) {
            return Err(AppError::Unauthorized(
                "Only the owner can view listing analytics".to_string(),
            ));
        }
        Ok(ListingAnalytics {
            impact_score: impact_score(&listing),
            impact: ImpactEstimate::for_listing(&listing),
            listing_id: listing.id,
            views: listing.view_count,
            claims: listing.claim_count,
            status: listing.status,
            created_at: listing.created_at,
        })
    }

    // ─── Edits ───────────────────────────────────────────────

    /// Owner edits of descriptive fields. Last writer wins.
    pub async fn update_listing(&self, id: &str, edit: ListingEdit, actor: &Actor) -> Result<Listing> {
        if edit.is_empty() {
            return Err(AppError::validation("body", "no editable fields supplied"));
        }
        let listing = self.load_active(id).await?;
        if actor.user_id() != Some(listing.owner_id.as_str()) {
            return Err(AppError::Unauthorized(
                "Only the owner can edit this listing".to_string(),
            ));
        }
        if listing.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Cannot edit a listing that is {}",
                listing.status
            )));
        }

        let now = self.clock.now();
        validate_edit(&listing, &edit, now)?;

        let patch = ListingPatch {
            edit: Some(edit),
            updated_at: Some(now),
            ..Default::default()
        };
        if !self.store.update(id, &patch).await? {
            return Err(AppError::NotFound(format!("Listing {}", id)));
        }
        let mut updated = listing;
        patch.apply(&mut updated);

        tracing::info!(listing_id = id, "Listing updated");
        self.hooks
            .run(&[CommitEffect::Event(ListingEvent::ListingUpdated {
                listing: Box::new(updated.clone()),
            })])
            .await;
        Ok(updated)
    }

    // ─── Lifecycle ───────────────────────────────────────────

    pub async fn claim_listing(&self, id: &str, actor: &Actor) -> Result<Listing> {
        let outcome = self.lifecycle.claim(id, actor).await?;
        Ok(self.finish(outcome).await)
    }

    /// Move a listing to `status` via the matching lifecycle event.
    pub async fn update_listing_status(
        &self,
        id: &str,
        status: ListingStatus,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Listing> {
        let event = LifecycleEvent::for_target(status).ok_or_else(|| {
            AppError::validation("status", "a listing cannot be moved back to available")
        })?;
        let outcome = self.lifecycle.transition(id, actor, event, reason).await?;
        Ok(self.finish(outcome).await)
    }

    /// Soft delete. Blocked while a volunteer holds the listing.
    pub async fn delete_listing(&self, id: &str, actor: &Actor) -> Result<()> {
        let listing = self.load_active(id).await?;
        if actor.user_id() != Some(listing.owner_id.as_str()) && !actor.is_admin() {
            return Err(AppError::Unauthorized(
                "Only the owner can delete this listing".to_string(),
            ));
        }
        if matches!(
            listing.status,
            ListingStatus::Claimed | ListingStatus::InTransit
        ) {
            return Err(AppError::Conflict(format!(
                "Cannot delete a listing that is {}",
                listing.status
            )));
        }

        let deleted = self
            .store
            .soft_delete(id, Precondition::Status(listing.status), self.clock.now())
            .await?;
        if !deleted {
            return Err(AppError::Conflict(
                "Listing changed while deleting; try again".to_string(),
            ));
        }

        tracing::info!(listing_id = id, actor_id = actor.user_id(), "Listing deleted");
        self.hooks
            .run(&[CommitEffect::Event(ListingEvent::ListingDeleted {
                listing_id: id.to_string(),
            })])
            .await;
        Ok(())
    }

    /// Expire every available listing past its expiry date.
    pub async fn expire_listings(&self) -> Result<SweepReport> {
        let report = self.lifecycle.sweep_expired().await?;
        if !report.expired.is_empty() {
            self.hooks
                .run(&[CommitEffect::Event(ListingEvent::ListingsExpired {
                    listing_ids: report.expired.clone(),
                })])
                .await;
        }
        Ok(report)
    }

    // ─── Dashboard ───────────────────────────────────────────

    pub async fn user_dashboard(&self, actor: &Actor) -> Result<UserDashboard> {
        let user_id = actor
            .user_id()
            .ok_or_else(|| AppError::Unauthorized("Dashboard requires a user".to_string()))?;

        let owned = self
            .store
            .query(&ListingQuery::new(ListingFilter {
                owner_id: Some(user_id.to_string()),
                ..Default::default()
            }))
            .await?;
        let volunteered = self
            .store
            .query(&ListingQuery::new(ListingFilter {
                volunteer_id: Some(user_id.to_string()),
                ..Default::default()
            }))
            .await?;

        let stats = self
            .directory
            .get_by_id(user_id)
            .await?
            .map(|profile| profile.stats)
            .unwrap_or_default();

        Ok(UserDashboard {
            summary: UserImpactSummary::from_listings(&owned, &volunteered),
            achievements: achievements(&stats),
            stats,
        })
    }

    /// Platform totals over every listing that has not been deleted.
    pub async fn platform_stats(&self) -> Result<PlatformStats> {
        let listings = self
            .store
            .query(&ListingQuery::new(ListingFilter {
                active: Some(true),
                ..Default::default()
            }))
            .await?;
        let total_users = self.directory.user_count().await?;
        Ok(PlatformStats::from_listings(&listings, total_users))
    }

    /// Active users ranked by impact score.
    pub async fn leaderboard(&self, limit: Option<u32>) -> Result<Vec<LeaderboardEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let users = self.directory.top_by_impact(limit).await?;
        Ok(users.into_iter().map(LeaderboardEntry::from).collect())
    }
}

/// Keep listings within `radius_km`, nearest first, tagged with their distance.
pub fn with_distances(
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    listings: Vec<Listing>,
) -> Vec<ListingView> {
    rank_by_distance(latitude, longitude, radius_km, listings, |listing| {
        Some((listing.location.latitude, listing.location.longitude))
    })
    .into_iter()
    .map(|(listing, distance)| ListingView {
        listing,
        distance_km: Some(round_km(distance)),
    })
    .collect()
}

// ─── Validation ──────────────────────────────────────────────

fn validate_quantity(quantity: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(AppError::validation("quantity", "must be greater than 0"));
    }
    Ok(())
}

fn validate_not_blank(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn validate_window(window: &PickupWindow) -> Result<()> {
    if !window.is_ordered() {
        return Err(AppError::validation(
            "pickup_window",
            "end must be after start",
        ));
    }
    Ok(())
}

/// Creation rules: dates must lie in the future and the window must be ordered.
pub fn validate_new_listing(input: &NewListing, now: DateTime<Utc>) -> Result<()> {
    validate_not_blank("title", &input.title)?;
    validate_not_blank("description", &input.description)?;
    validate_not_blank("unit", &input.unit)?;
    validate_quantity(input.quantity)?;
    if !input.location.is_valid() {
        return Err(AppError::validation(
            "location",
            "must be a valid latitude/longitude pair",
        ));
    }
    if input.expiry_date <= now {
        return Err(AppError::validation("expiry_date", "must be in the future"));
    }
    if input.pickup_window.start <= now {
        return Err(AppError::validation(
            "pickup_window",
            "start must be in the future",
        ));
    }
    validate_window(&input.pickup_window)
}

/// Edit rules: supplied fields follow the creation rules. An untouched pickup
/// window only needs to stay ordered.
fn validate_edit(listing: &Listing, edit: &ListingEdit, now: DateTime<Utc>) -> Result<()> {
    if let Some(title) = &edit.title {
        validate_not_blank("title", title)?;
    }
    if let Some(description) = &edit.description {
        validate_not_blank("description", description)?;
    }
    if let Some(unit) = &edit.unit {
        validate_not_blank("unit", unit)?;
    }
    if let Some(quantity) = edit.quantity {
        validate_quantity(quantity)?;
    }
    if let Some(location) = &edit.location {
        if !location.is_valid() {
            return Err(AppError::validation(
                "location",
                "must be a valid latitude/longitude pair",
            ));
        }
    }
    if let Some(expiry_date) = edit.expiry_date {
        if expiry_date <= now {
            return Err(AppError::validation("expiry_date", "must be in the future"));
        }
    }
    match &edit.pickup_window {
        Some(window) if window.start <= now => Err(AppError::validation(
            "pickup_window",
            "start must be in the future",
        )),
        Some(window) => validate_window(window),
        None => validate_window(&listing.pickup_window),
    }
}
