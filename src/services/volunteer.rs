// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Volunteer-facing operations: nearby volunteers, owner-initiated matching,
//! pickup opportunities and availability preferences.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::hooks::{CommitEffect, ListingEvent, PostCommitHooks};
use super::lifecycle::Actor;
use super::listing::{page_limit, with_distances, GeoFilter, SearchLimits, UserSummary};
use super::matcher::{VolunteerMatch, VolunteerMatcher};
use crate::db::{
    ListingFilter, ListingQuery, ListingStore, SortDirection, SortField, UserDirectory,
};
use crate::error::{AppError, Result};
use crate::models::user::{achievements, Achievement};
use crate::models::{
    Availability, Listing, ListingStatus, ListingView, PickupWindow, UserProfile, UserRole,
};

pub const DEFAULT_MAX_VOLUNTEERS: usize = 5;
pub const MAX_VOLUNTEERS_LIMIT: usize = 50;
/// Pickups listed on a volunteer's own stats page.
pub const RECENT_PICKUPS_LIMIT: u32 = 10;

/// A listing the volunteer claimed, newest claim first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPickup {
    pub id: String,
    pub title: String,
    pub status: ListingStatus,
    pub claimed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<Listing> for RecentPickup {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            title: listing.title,
            status: listing.status,
            claimed_at: listing.claimed_at,
            delivered_at: listing.delivered_at,
        }
    }
}

/// Details only the volunteer themself gets to see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnVolunteerDetails {
    pub recent_pickups: Vec<RecentPickup>,
    pub achievements: Vec<Achievement>,
    pub availability: Availability,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolunteerStats {
    pub volunteer: UserSummary,
    pub total_pickups: u64,
    pub total_deliveries: u64,
    pub impact_score: u64,
    #[serde(flatten)]
    pub own: Option<OwnVolunteerDetails>,
}

#[derive(Clone)]
pub struct VolunteerService {
    store: Arc<dyn ListingStore>,
    directory: Arc<dyn UserDirectory>,
    matcher: VolunteerMatcher,
    hooks: PostCommitHooks,
    limits: SearchLimits,
}

impl VolunteerService {
    pub fn new(
        store: Arc<dyn ListingStore>,
        directory: Arc<dyn UserDirectory>,
        hooks: PostCommitHooks,
        limits: SearchLimits,
    ) -> Self {
        let matcher = VolunteerMatcher::new(directory.clone());
        Self {
            store,
            directory,
            matcher,
            hooks,
            limits,
        }
    }

    /// Volunteers near a point, optionally available on the window's weekday.
    pub async fn nearby_volunteers(
        &self,
        near: GeoFilter,
        pickup_window: Option<PickupWindow>,
    ) -> Result<Vec<VolunteerMatch>> {
        near.validate()?;
        let radius = self.limits.radius(near.radius_km)?;
        if let Some(window) = &pickup_window {
            if !window.is_ordered() {
                return Err(AppError::validation(
                    "pickup_window",
                    "end must be after start",
                ));
            }
        }
        self.matcher
            .find_nearby(near.latitude, near.longitude, radius, pickup_window.as_ref())
            .await
    }

    /// Best volunteers for an available listing, nearest first.
    ///
    /// Only the owner may ask. Each match is announced as a `volunteer_matched` event.
    pub async fn match_volunteers(
        &self,
        listing_id: &str,
        max_volunteers: Option<usize>,
        actor: &Actor,
    ) -> Result<Vec<VolunteerMatch>> {
        let max = max_volunteers.unwrap_or(DEFAULT_MAX_VOLUNTEERS);
        if !(1..=MAX_VOLUNTEERS_LIMIT).contains(&max) {
            return Err(AppError::validation(
                "max_volunteers",
                format!("must be between 1 and {}", MAX_VOLUNTEERS_LIMIT),
            ));
        }

        let listing = self
            .store
            .get_by_id(listing_id)
            .await?
            .filter(|listing| listing.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Listing {}", listing_id)))?;
        if actor.user_id() != Some(listing.owner_id.as_str()) {
            return Err(AppError::Unauthorized(
                "Only the owner can match volunteers".to_string(),
            ));
        }
        if listing.status != ListingStatus::Available {
            return Err(AppError::Conflict("Listing is not available".to_string()));
        }

        let mut matches = self
            .matcher
            .find_nearby(
                listing.location.latitude,
                listing.location.longitude,
                self.limits.match_radius_km,
                Some(&listing.pickup_window),
            )
            .await?;
        matches.truncate(max);

        tracing::info!(
            listing_id,
            matches = matches.len(),
            "Matched volunteers to listing"
        );

        let effects: Vec<CommitEffect> = matches
            .iter()
            .map(|m| {
                CommitEffect::Event(ListingEvent::VolunteerMatched {
                    listing_id: listing.id.clone(),
                    volunteer_id: m.user_id.clone(),
                    distance_km: m.distance_km,
                })
            })
            .collect();
        self.hooks.run(&effects).await;

        Ok(matches)
    }

    /// Available listings the actor could pick up, excluding their own.
    pub async fn opportunities(
        &self,
        actor: &Actor,
        near: Option<GeoFilter>,
        limit: Option<u32>,
    ) -> Result<Vec<ListingView>> {
        let user_id = volunteer_id(actor)?;
        let limit = page_limit(limit) as usize;

        let available = self
            .store
            .query(&ListingQuery::new(ListingFilter::available()))
            .await?;
        let others: Vec<_> = available
            .into_iter()
            .filter(|listing| !listing.is_owned_by(user_id))
            .collect();

        let mut views = match near {
            Some(near) => {
                near.validate()?;
                let radius = self.limits.radius(near.radius_km)?;
                with_distances(near.latitude, near.longitude, radius, others)
            }
            None => others.into_iter().map(ListingView::from).collect(),
        };
        views.truncate(limit);
        Ok(views)
    }

    /// Public counters for a volunteer, plus recent pickups, achievements and
    /// availability when they ask about themselves.
    pub async fn volunteer_stats(
        &self,
        volunteer_id: &str,
        actor: &Actor,
    ) -> Result<VolunteerStats> {
        let profile = self
            .directory
            .get_by_id(volunteer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Volunteer {}", volunteer_id)))?;
        if profile.role != UserRole::Volunteer {
            return Err(AppError::validation(
                "volunteer_id",
                "User is not a volunteer",
            ));
        }

        let own = if actor.user_id() == Some(volunteer_id) {
            let query = ListingQuery::new(ListingFilter {
                volunteer_id: Some(volunteer_id.to_string()),
                ..Default::default()
            })
            .sorted(SortField::ClaimedAt, SortDirection::Desc)
            .page(RECENT_PICKUPS_LIMIT, 0);
            let recent = self.store.query(&query).await?;
            Some(OwnVolunteerDetails {
                recent_pickups: recent.into_iter().map(RecentPickup::from).collect(),
                achievements: achievements(&profile.stats),
                availability: profile.availability.clone(),
            })
        } else {
            None
        };

        Ok(VolunteerStats {
            total_pickups: profile.stats.total_pickups,
            total_deliveries: profile.stats.total_deliveries,
            impact_score: profile.stats.impact_score,
            own,
            volunteer: UserSummary::from(profile),
        })
    }

    /// Replace the actor's availability preferences.
    pub async fn update_availability(
        &self,
        actor: &Actor,
        availability: Availability,
    ) -> Result<UserProfile> {
        let user_id = volunteer_id(actor)?;
        let max = availability.max_distance_km;
        if !max.is_finite() || max <= 0.0 || max > self.limits.max_delivery_distance_km {
            return Err(AppError::validation(
                "max_distance_km",
                format!(
                    "must be greater than 0 and at most {} km",
                    self.limits.max_delivery_distance_km
                ),
            ));
        }

        let mut profile = self
            .directory
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;
        profile.availability = availability;
        self.directory.upsert(&profile).await?;

        tracing::info!(user_id, "Volunteer availability updated");
        Ok(profile)
    }
}

/// The actor's id, if they act as a volunteer.
fn volunteer_id(actor: &Actor) -> Result<&str> {
    match actor.user_id() {
        Some(id) if actor.has_role(UserRole::Volunteer) => Ok(id),
        _ => Err(AppError::Unauthorized(
            "This endpoint is only available to volunteers".to_string(),
        )),
    }
}
