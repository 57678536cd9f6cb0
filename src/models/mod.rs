// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Data models for the application.

pub mod listing;
pub mod location;
pub mod user;

pub use listing::{
    Allergen, FoodCategory, Listing, ListingEdit, ListingStatus, ListingView, NewListing,
    PickupWindow,
};
pub use location::Location;
pub use user::{Availability, DayOfWeek, StatsDelta, UserProfile, UserRole, UserStats};
