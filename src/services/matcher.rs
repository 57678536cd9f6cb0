// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Distance-ranked volunteer matching.
//!
//! Every query is a full scan of the candidate pool. The directory narrows
//! the pool to a bounding box first; the exact Haversine radius check and the
//! ordering happen here.

use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::UserDirectory;
use crate::error::Result;
use crate::models::location::{bounding_box, haversine_km, round_km};
use crate::models::{PickupWindow, UserProfile, UserRole};
use crate::time_utils::day_of_week;

/// Roles offered as pickup candidates.
pub const MATCHABLE_ROLES: [UserRole; 1] = [UserRole::Volunteer];

/// A candidate within range of the origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VolunteerMatch {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    /// Rounded to 2 decimals.
    pub distance_km: f64,
    pub total_pickups: u64,
}

/// Keep the items within `radius_km` of the origin, nearest first.
///
/// Items without a location are skipped. The filter and the sort use the
/// unrounded distance, which is returned alongside each item; ties keep their
/// input order.
pub fn rank_by_distance<T, F>(
    origin_lat: f64,
    origin_lng: f64,
    radius_km: f64,
    items: impl IntoIterator<Item = T>,
    locate: F,
) -> Vec<(T, f64)>
where
    F: Fn(&T) -> Option<(f64, f64)>,
{
    let mut ranked: Vec<(T, f64)> = items
        .into_iter()
        .filter_map(|item| {
            let (lat, lng) = locate(&item)?;
            let distance = haversine_km(origin_lat, origin_lng, lat, lng);
            (distance <= radius_km).then_some((item, distance))
        })
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

/// Matches volunteers to a pickup location.
#[derive(Clone)]
pub struct VolunteerMatcher {
    directory: Arc<dyn UserDirectory>,
}

impl VolunteerMatcher {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Rank `candidates` by distance from the origin.
    ///
    /// With a pickup window, candidates must also list the window's start
    /// weekday (UTC) in their availability.
    pub fn rank(
        origin_lat: f64,
        origin_lng: f64,
        radius_km: f64,
        pickup_window: Option<&PickupWindow>,
        candidates: &[UserProfile],
    ) -> Vec<VolunteerMatch> {
        let weekday = pickup_window.map(|window| day_of_week(window.start));

        let available = candidates.iter().filter(|candidate| {
            weekday.is_none_or(|day| candidate.availability.weekdays.contains(&day))
        });

        rank_by_distance(origin_lat, origin_lng, radius_km, available, |candidate| {
            candidate
                .location
                .as_ref()
                .map(|loc| (loc.latitude, loc.longitude))
        })
        .into_iter()
        .map(|(candidate, distance)| VolunteerMatch {
            user_id: candidate.id.clone(),
            first_name: candidate.first_name.clone(),
            last_name: candidate.last_name.clone(),
            distance_km: round_km(distance),
            total_pickups: candidate.stats.total_pickups,
        })
        .collect()
    }

    /// Fetch volunteer-role users around the origin and rank them.
    pub async fn find_nearby(
        &self,
        origin_lat: f64,
        origin_lng: f64,
        radius_km: f64,
        pickup_window: Option<&PickupWindow>,
    ) -> Result<Vec<VolunteerMatch>> {
        let bounds = bounding_box(origin_lat, origin_lng, radius_km);
        let candidates = self
            .directory
            .query_by_role_and_bounds(&MATCHABLE_ROLES, bounds)
            .await?;

        let matches = Self::rank(origin_lat, origin_lng, radius_km, pickup_window, &candidates);
        tracing::debug!(
            candidates = candidates.len(),
            matches = matches.len(),
            radius_km,
            "Volunteer match scan"
        );
        Ok(matches)
    }
}
