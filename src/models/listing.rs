// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Food listing model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::location::Location;

/// Lifecycle status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ListingStatus {
    Available,
    Claimed,
    InTransit,
    Delivered,
    Expired,
    Cancelled,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 6] = [
        ListingStatus::Available,
        ListingStatus::Claimed,
        ListingStatus::InTransit,
        ListingStatus::Delivered,
        ListingStatus::Expired,
        ListingStatus::Cancelled,
    ];

    /// Stored/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Claimed => "claimed",
            ListingStatus::InTransit => "in_transit",
            ListingStatus::Delivered => "delivered",
            ListingStatus::Expired => "expired",
            ListingStatus::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ListingStatus::Delivered | ListingStatus::Expired | ListingStatus::Cancelled
        )
    }

    /// States in which a volunteer is attached to the listing.
    pub fn has_volunteer(self) -> bool {
        matches!(
            self,
            ListingStatus::Claimed | ListingStatus::InTransit | ListingStatus::Delivered
        )
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown listing status '{}'", s))
    }
}

/// Food category, drives the impact multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum FoodCategory {
    Produce,
    Dairy,
    Meat,
    Bakery,
    Pantry,
    Prepared,
    Beverages,
    Snacks,
    Other,
}

impl FoodCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FoodCategory::Produce => "produce",
            FoodCategory::Dairy => "dairy",
            FoodCategory::Meat => "meat",
            FoodCategory::Bakery => "bakery",
            FoodCategory::Pantry => "pantry",
            FoodCategory::Prepared => "prepared",
            FoodCategory::Beverages => "beverages",
            FoodCategory::Snacks => "snacks",
            FoodCategory::Other => "other",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allergen tags a donor can attach to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Allergen {
    Nuts,
    Dairy,
    Eggs,
    Soy,
    Wheat,
    Fish,
    Shellfish,
    Sesame,
}

/// Time range during which the food can be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PickupWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PickupWindow {
    pub fn is_ordered(&self) -> bool {
        self.end > self.start
    }

    /// The window has closed as of `now`.
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.end <= now
    }
}

/// Stored listing document.
///
/// `volunteer_id` is set exactly when `status.has_volunteer()`; the lifecycle
/// service is the only writer of `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Listing {
    /// Document ID
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: FoodCategory,
    pub quantity: f64,
    /// Free text ("kg", "pieces", ...)
    pub unit: String,
    pub location: Location,
    pub expiry_date: DateTime<Utc>,
    pub pickup_window: PickupWindow,
    #[serde(default)]
    pub allergens: BTreeSet<Allergen>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub volunteer_id: Option<String>,
    pub status: ListingStatus,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub claim_count: u64,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pickup_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Build a fresh `available` listing from validated input.
    pub fn from_new(id: String, input: NewListing, owner_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: input.title,
            description: input.description,
            category: input.category,
            quantity: input.quantity,
            unit: input.unit,
            location: input.location,
            expiry_date: input.expiry_date,
            pickup_window: input.pickup_window,
            allergens: input.allergens,
            special_instructions: input.special_instructions,
            owner_id: owner_id.to_string(),
            volunteer_id: None,
            status: ListingStatus::Available,
            view_count: 0,
            claim_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            claimed_at: None,
            pickup_at: None,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            expired_at: None,
            deleted_at: None,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn is_volunteer(&self, user_id: &str) -> bool {
        self.volunteer_id.as_deref() == Some(user_id)
    }

    /// Case-insensitive substring match on title, description and category.
    pub fn matches_term(&self, term_lower: &str) -> bool {
        self.title.to_lowercase().contains(term_lower)
            || self.description.to_lowercase().contains(term_lower)
            || self.category.as_str().contains(term_lower)
    }
}

/// Validated input for a new listing, before an id and owner are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub category: FoodCategory,
    pub quantity: f64,
    pub unit: String,
    pub location: Location,
    pub expiry_date: DateTime<Utc>,
    pub pickup_window: PickupWindow,
    #[serde(default)]
    pub allergens: BTreeSet<Allergen>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

/// Owner-editable fields. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pickup_window: Option<PickupWindow>,
    #[serde(default)]
    pub allergens: Option<BTreeSet<Allergen>>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

impl ListingEdit {
    pub fn is_empty(&self) -> bool {
        self == &ListingEdit::default()
    }
}

/// Listing as returned by geo-aware queries.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: Listing,
    /// Kilometers from the query origin, rounded to 2 decimals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl From<Listing> for ListingView {
    fn from(listing: Listing) -> Self {
        Self {
            listing,
            distance_km: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in ListingStatus::ALL {
            assert_eq!(status.as_str().parse::<ListingStatus>(), Ok(status));
        }
        assert!("archived".parse::<ListingStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ListingStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");
    }

    #[test]
    fn test_terminal_and_volunteer_states() {
        assert!(ListingStatus::Delivered.is_terminal());
        assert!(ListingStatus::Expired.is_terminal());
        assert!(ListingStatus::Cancelled.is_terminal());
        assert!(!ListingStatus::Claimed.is_terminal());

        assert!(ListingStatus::InTransit.has_volunteer());
        assert!(!ListingStatus::Available.has_volunteer());
        assert!(!ListingStatus::Cancelled.has_volunteer());
    }

    #[test]
    fn test_pickup_window_lapsed() {
        let now = Utc::now();
        let window = PickupWindow {
            start: now - Duration::hours(2),
            end: now - Duration::minutes(1),
        };
        assert!(window.is_ordered());
        assert!(window.has_lapsed(now));
        assert!(!window.has_lapsed(now - Duration::minutes(5)));
    }

    #[test]
    fn test_listing_edit_empty() {
        assert!(ListingEdit::default().is_empty());
        let edit = ListingEdit {
            quantity: Some(2.0),
            ..Default::default()
        };
        assert!(!edit.is_empty());
    }
}
