// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! In-process store used by tests and local runs without a Firestore emulator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use geo::Rect;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{
    rank_by_impact, ListingPatch, ListingQuery, ListingStore, Precondition, SortDirection,
    UserDirectory,
};
use crate::error::{AppError, Result};
use crate::models::location::bounds_contain;
use crate::models::{Listing, NewListing, StatsDelta, UserProfile, UserRole};

/// Listing and user documents held in concurrent maps.
///
/// `atomic_update` runs under the map entry's write lock, so the
/// precondition check and the write cannot interleave with another update of
/// the same listing.
#[derive(Clone, Default)]
pub struct MemoryDb {
    listings: Arc<DashMap<String, Listing>>,
    users: Arc<DashMap<String, UserProfile>>,
    fail_stats: Arc<AtomicBool>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `increment_stats` call fail, to exercise best-effort hooks.
    pub fn fail_stats_updates(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }
}

#[async_trait]
impl ListingStore for MemoryDb {
    async fn create(&self, input: NewListing, owner_id: &str, now: DateTime<Utc>) -> Result<Listing> {
        let listing = Listing::from_new(uuid::Uuid::new_v4().to_string(), input, owner_id, now);
        self.listings.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Listing>> {
        Ok(self.listings.get(id).map(|entry| entry.value().clone()))
    }

    async fn query(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let mut matches: Vec<Listing> = self
            .listings
            .iter()
            .filter(|entry| query.filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        matches.sort_by(|a, b| {
            let ordering = query.sort.compare(a, b).then_with(|| a.id.cmp(&b.id));
            match query.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let skipped = matches.into_iter().skip(query.offset as usize);
        Ok(match query.limit {
            Some(limit) => skipped.take(limit as usize).collect(),
            None => skipped.collect(),
        })
    }

    async fn atomic_update(
        &self,
        id: &str,
        precondition: Precondition,
        patch: &ListingPatch,
    ) -> Result<bool> {
        let Some(mut entry) = self.listings.get_mut(id) else {
            return Ok(false);
        };
        if !precondition.holds(entry.value()) {
            return Ok(false);
        }
        patch.apply(entry.value_mut());
        Ok(true)
    }
}

#[async_trait]
impl UserDirectory for MemoryDb {
    async fn get_by_id(&self, id: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn query_by_role_and_bounds(
        &self,
        roles: &[UserRole],
        bounds: Rect<f64>,
    ) -> Result<Vec<UserProfile>> {
        let mut users: Vec<UserProfile> = self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|user| user.is_active && roles.contains(&user.role))
            .filter(|user| {
                user.location
                    .as_ref()
                    .is_some_and(|loc| bounds_contain(&bounds, loc.latitude, loc.longitude))
            })
            .collect();
        // DashMap iteration order is arbitrary; keep results reproducible.
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn increment_stats(&self, id: &str, delta: StatsDelta) -> Result<()> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(AppError::Database("stats store unavailable".to_string()));
        }
        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;
        entry.value_mut().stats.apply(&delta);
        Ok(())
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<()> {
        self.users.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn top_by_impact(&self, limit: u32) -> Result<Vec<UserProfile>> {
        let mut users: Vec<UserProfile> = self
            .users
            .iter()
            .filter(|entry| entry.value().is_active)
            .map(|entry| entry.value().clone())
            .collect();
        rank_by_impact(&mut users);
        users.truncate(limit as usize);
        Ok(users)
    }

    async fn user_count(&self) -> Result<u64> {
        Ok(self.users.len() as u64)
    }
}
