// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Persistence collaborators: the listing store and the user directory.
//!
//! Two implementations live here: [`FirestoreDb`] for production and
//! [`MemoryDb`] for tests and local runs without the emulator.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::Rect;

use crate::error::Result;
use crate::models::{FoodCategory, Listing, ListingEdit, ListingStatus, NewListing};
use crate::models::{StatsDelta, UserProfile, UserRole};

/// Collection names as constants.
pub mod collections {
    pub const LISTINGS: &str = "listings";
    pub const USERS: &str = "users";
}

/// Default page size for listing queries.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Hard cap on listing page size.
pub const MAX_PAGE_LIMIT: u32 = 100;

// ─── Queries ─────────────────────────────────────────────────

/// Equality filters understood by every store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    /// `Some(true)` hides soft-deleted listings.
    pub active: Option<bool>,
    pub status: Option<ListingStatus>,
    pub category: Option<FoodCategory>,
    pub owner_id: Option<String>,
    pub volunteer_id: Option<String>,
}

impl ListingFilter {
    /// Active listings currently open for claims.
    pub fn available() -> Self {
        Self {
            active: Some(true),
            status: Some(ListingStatus::Available),
            ..Default::default()
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.active.is_none_or(|active| listing.is_active == active)
            && self.status.is_none_or(|status| listing.status == status)
            && self.category.is_none_or(|category| listing.category == category)
            && self
                .owner_id
                .as_deref()
                .is_none_or(|owner| listing.owner_id == owner)
            && self
                .volunteer_id
                .as_deref()
                .is_none_or(|volunteer| listing.volunteer_id.as_deref() == Some(volunteer))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    ExpiryDate,
    PickupStart,
    Quantity,
    ClaimedAt,
}

impl SortField {
    /// Document field path.
    pub fn field_path(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::ExpiryDate => "expiry_date",
            SortField::PickupStart => "pickup_window.start",
            SortField::Quantity => "quantity",
            SortField::ClaimedAt => "claimed_at",
        }
    }

    pub fn compare(self, a: &Listing, b: &Listing) -> std::cmp::Ordering {
        match self {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::ExpiryDate => a.expiry_date.cmp(&b.expiry_date),
            SortField::PickupStart => a.pickup_window.start.cmp(&b.pickup_window.start),
            SortField::Quantity => a.quantity.total_cmp(&b.quantity),
            // Unclaimed listings sort before any claim time.
            SortField::ClaimedAt => a.claimed_at.cmp(&b.claimed_at),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Filter, sort and page for a listing query.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filter: ListingFilter,
    pub sort: SortField,
    pub direction: SortDirection,
    /// `None` returns every match (maintenance scans, search).
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ListingQuery {
    pub fn new(filter: ListingFilter) -> Self {
        Self {
            filter,
            sort: SortField::default(),
            direction: SortDirection::default(),
            limit: None,
            offset: 0,
        }
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    pub fn sorted(mut self, sort: SortField, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }
}

// ─── Writes ──────────────────────────────────────────────────

/// Condition checked inside the same atomic step as the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The listing exists and is active.
    Active,
    /// The listing is active and currently in this status.
    Status(ListingStatus),
    /// The listing is active, available and its expiry date is at or before
    /// the instant. An edit that pushed the expiry out voids the write.
    ExpiredBy(DateTime<Utc>),
}

impl Precondition {
    pub fn holds(&self, listing: &Listing) -> bool {
        match self {
            Precondition::Active => listing.is_active,
            Precondition::Status(status) => listing.is_active && listing.status == *status,
            Precondition::ExpiredBy(at) => {
                listing.is_active
                    && listing.status == ListingStatus::Available
                    && listing.expiry_date <= *at
            }
        }
    }
}

/// Partial update of a listing document. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPatch {
    pub status: Option<ListingStatus>,
    pub volunteer_id: Option<String>,
    /// Detach the volunteer (cancelling a claimed listing).
    pub clear_volunteer: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub expired_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
    pub edit: Option<ListingEdit>,
    pub increment_claim_count: bool,
    pub increment_view_count: bool,
}

impl ListingPatch {
    /// Apply the patch to an in-memory document.
    pub fn apply(&self, listing: &mut Listing) {
        if let Some(status) = self.status {
            listing.status = status;
        }
        if let Some(volunteer_id) = &self.volunteer_id {
            listing.volunteer_id = Some(volunteer_id.clone());
        }
        if self.clear_volunteer {
            listing.volunteer_id = None;
        }
        set_once(&mut listing.claimed_at, self.claimed_at);
        set_once(&mut listing.pickup_at, self.pickup_at);
        set_once(&mut listing.delivered_at, self.delivered_at);
        set_once(&mut listing.cancelled_at, self.cancelled_at);
        set_once(&mut listing.expired_at, self.expired_at);
        set_once(&mut listing.deleted_at, self.deleted_at);
        if let Some(reason) = &self.cancellation_reason {
            listing.cancellation_reason = Some(reason.clone());
        }
        if let Some(active) = self.is_active {
            listing.is_active = active;
        }
        if let Some(updated_at) = self.updated_at {
            listing.updated_at = updated_at;
        }
        if let Some(edit) = &self.edit {
            apply_edit(listing, edit);
        }
        if self.increment_claim_count {
            listing.claim_count += 1;
        }
        if self.increment_view_count {
            listing.view_count += 1;
        }
    }

    /// Document fields written by this patch (for field-masked updates).
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        let mut push = |set: bool, path: &'static str| {
            if set {
                paths.push(path);
            }
        };
        push(self.status.is_some(), "status");
        push(
            self.volunteer_id.is_some() || self.clear_volunteer,
            "volunteer_id",
        );
        push(self.claimed_at.is_some(), "claimed_at");
        push(self.pickup_at.is_some(), "pickup_at");
        push(self.delivered_at.is_some(), "delivered_at");
        push(self.cancelled_at.is_some(), "cancelled_at");
        push(self.cancellation_reason.is_some(), "cancellation_reason");
        push(self.expired_at.is_some(), "expired_at");
        push(self.deleted_at.is_some(), "deleted_at");
        push(self.is_active.is_some(), "is_active");
        push(self.updated_at.is_some(), "updated_at");
        push(self.increment_claim_count, "claim_count");
        push(self.increment_view_count, "view_count");
        if let Some(edit) = &self.edit {
            push(edit.title.is_some(), "title");
            push(edit.description.is_some(), "description");
            push(edit.quantity.is_some(), "quantity");
            push(edit.unit.is_some(), "unit");
            push(edit.location.is_some(), "location");
            push(edit.expiry_date.is_some(), "expiry_date");
            push(edit.pickup_window.is_some(), "pickup_window");
            push(edit.allergens.is_some(), "allergens");
            push(edit.special_instructions.is_some(), "special_instructions");
        }
        paths
    }
}

/// Transition timestamps are written once and never overwritten.
fn set_once(slot: &mut Option<DateTime<Utc>>, value: Option<DateTime<Utc>>) {
    if slot.is_none() {
        if let Some(value) = value {
            *slot = Some(value);
        }
    }
}

fn apply_edit(listing: &mut Listing, edit: &ListingEdit) {
    if let Some(title) = &edit.title {
        listing.title = title.clone();
    }
    if let Some(description) = &edit.description {
        listing.description = description.clone();
    }
    if let Some(quantity) = edit.quantity {
        listing.quantity = quantity;
    }
    if let Some(unit) = &edit.unit {
        listing.unit = unit.clone();
    }
    if let Some(location) = &edit.location {
        listing.location = location.clone();
    }
    if let Some(expiry_date) = edit.expiry_date {
        listing.expiry_date = expiry_date;
    }
    if let Some(pickup_window) = edit.pickup_window {
        listing.pickup_window = pickup_window;
    }
    if let Some(allergens) = &edit.allergens {
        listing.allergens = allergens.clone();
    }
    if let Some(instructions) = &edit.special_instructions {
        listing.special_instructions = Some(instructions.clone());
    }
}

// ─── Collaborator traits ─────────────────────────────────────

/// Persisted listing records.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Persist a new `available` listing and return it with its assigned id.
    async fn create(
        &self,
        input: NewListing,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Listing>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Listing>>;

    async fn query(&self, query: &ListingQuery) -> Result<Vec<Listing>>;

    /// Check `precondition` and apply `patch` as one indivisible step scoped to
    /// the listing. Returns `false` (and writes nothing) when the precondition
    /// fails or the listing does not exist.
    async fn atomic_update(
        &self,
        id: &str,
        precondition: Precondition,
        patch: &ListingPatch,
    ) -> Result<bool>;

    /// Field edits on an active listing. Last writer wins.
    async fn update(&self, id: &str, patch: &ListingPatch) -> Result<bool> {
        self.atomic_update(id, Precondition::Active, patch).await
    }

    async fn increment_view_count(&self, id: &str) -> Result<bool> {
        let patch = ListingPatch {
            increment_view_count: true,
            ..Default::default()
        };
        self.atomic_update(id, Precondition::Active, &patch).await
    }

    /// Mark a listing inactive, provided `precondition` still holds.
    async fn soft_delete(
        &self,
        id: &str,
        precondition: Precondition,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let patch = ListingPatch {
            is_active: Some(false),
            deleted_at: Some(at),
            updated_at: Some(at),
            ..Default::default()
        };
        self.atomic_update(id, precondition, &patch).await
    }
}

/// Read access to user profiles plus the stats counters the core maintains.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<UserProfile>>;

    /// Active users with one of `roles` whose location falls inside `bounds`
    /// (x = longitude, y = latitude). Precise distance filtering is the caller's job.
    async fn query_by_role_and_bounds(
        &self,
        roles: &[UserRole],
        bounds: Rect<f64>,
    ) -> Result<Vec<UserProfile>>;

    async fn increment_stats(&self, id: &str, delta: StatsDelta) -> Result<()>;

    async fn upsert(&self, profile: &UserProfile) -> Result<()>;

    /// Active users with the highest impact score, ties broken by id.
    async fn top_by_impact(&self, limit: u32) -> Result<Vec<UserProfile>>;

    /// Every registered profile, active or not.
    async fn user_count(&self) -> Result<u64>;
}

/// Leaderboard order: impact score descending, then id.
pub fn rank_by_impact(users: &mut [UserProfile]) {
    users.sort_by(|a, b| {
        b.stats
            .impact_score
            .cmp(&a.stats.impact_score)
            .then_with(|| a.id.cmp(&b.id))
    });
}
