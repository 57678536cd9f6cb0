// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Meals, CO2 and water estimates for rescued food, plus the category
//! multiplier used for volunteer impact scores.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{FoodCategory, Listing, ListingStatus};

/// Kilograms per meal.
pub const DEFAULT_SERVING_SIZE_KG: f64 = 0.5;
pub const CO2_PER_MEAL_KG: f64 = 2.5;
pub const WATER_PER_MEAL_LITERS: f64 = 25.0;

/// Kilogram equivalent of one unit. Unknown units count as 1 kg.
pub fn unit_weight_kg(unit: &str) -> f64 {
    match unit {
        "kg" => 1.0,
        "lbs" => 0.453592,
        "pieces" => 0.2,
        "servings" => 0.5,
        "liters" => 1.0,
        "gallons" => 3.78541,
        _ => 1.0,
    }
}

pub fn category_multiplier(category: FoodCategory) -> f64 {
    match category {
        FoodCategory::Meat => 3.0,
        FoodCategory::Dairy => 2.5,
        FoodCategory::Prepared => 2.0,
        FoodCategory::Produce => 1.5,
        FoodCategory::Bakery => 1.3,
        FoodCategory::Pantry => 1.2,
        FoodCategory::Beverages | FoodCategory::Snacks | FoodCategory::Other => 1.0,
    }
}

/// Estimated meals for a quantity, never less than one.
pub fn estimate_meals(quantity: f64, unit: &str) -> u64 {
    let meals = (quantity * unit_weight_kg(unit) / DEFAULT_SERVING_SIZE_KG).round();
    if meals.is_finite() && meals >= 1.0 {
        meals as u64
    } else {
        1
    }
}

/// Rounded to cents of a kilogram.
pub fn co2_saved_kg(meals: u64) -> f64 {
    (meals as f64 * CO2_PER_MEAL_KG * 100.0).round() / 100.0
}

pub fn water_saved_liters(meals: u64) -> f64 {
    meals as f64 * WATER_PER_MEAL_LITERS
}

/// Score accrued by the volunteer who delivers `listing`.
pub fn impact_score(listing: &Listing) -> u64 {
    let score = (listing.quantity * category_multiplier(listing.category)).round();
    if score.is_finite() && score > 0.0 {
        score as u64
    } else {
        0
    }
}

/// Derived environmental impact of one listing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImpactEstimate {
    pub meals: u64,
    pub co2_saved_kg: f64,
    pub water_saved_liters: f64,
}

impl ImpactEstimate {
    pub fn for_quantity(quantity: f64, unit: &str) -> Self {
        let meals = estimate_meals(quantity, unit);
        Self {
            meals,
            co2_saved_kg: co2_saved_kg(meals),
            water_saved_liters: water_saved_liters(meals),
        }
    }

    pub fn for_listing(listing: &Listing) -> Self {
        Self::for_quantity(listing.quantity, &listing.unit)
    }
}

/// Impact totals for one user, from the listings they own and deliver.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserImpactSummary {
    pub total_listings_created: u64,
    pub active_listings: u64,
    pub completed_listings: u64,
    pub total_pickups_completed: u64,
    pub total_meals_shared: u64,
    pub total_co2_saved_kg: f64,
    pub total_water_saved_liters: f64,
}

impl UserImpactSummary {
    /// `owned` are the user's listings, `volunteered` the ones they picked up.
    pub fn from_listings(owned: &[Listing], volunteered: &[Listing]) -> Self {
        let mut summary = Self::default();
        for listing in owned {
            summary.total_listings_created += 1;
            match listing.status {
                ListingStatus::Available if listing.is_active => summary.active_listings += 1,
                ListingStatus::Delivered => {
                    let impact = ImpactEstimate::for_listing(listing);
                    summary.completed_listings += 1;
                    summary.total_meals_shared += impact.meals;
                    summary.total_co2_saved_kg += impact.co2_saved_kg;
                    summary.total_water_saved_liters += impact.water_saved_liters;
                }
                _ => {}
            }
        }
        summary.total_pickups_completed = volunteered
            .iter()
            .filter(|l| l.status == ListingStatus::Delivered)
            .count() as u64;
        summary
    }
}

/// Platform-wide totals for the public dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlatformStats {
    pub total_listings: u64,
    pub total_users: u64,
    pub active_listings: u64,
    pub completed_listings: u64,
    pub total_meals_rescued: u64,
    pub total_co2_saved_kg: f64,
    pub total_water_saved_liters: f64,
}

impl PlatformStats {
    /// Impact counts delivered listings only.
    pub fn from_listings(listings: &[Listing], total_users: u64) -> Self {
        let mut stats = Self {
            total_listings: listings.len() as u64,
            total_users,
            ..Default::default()
        };
        for listing in listings {
            match listing.status {
                ListingStatus::Available => stats.active_listings += 1,
                ListingStatus::Delivered => {
                    let impact = ImpactEstimate::for_listing(listing);
                    stats.completed_listings += 1;
                    stats.total_meals_rescued += impact.meals;
                    stats.total_co2_saved_kg += impact.co2_saved_kg;
                    stats.total_water_saved_liters += impact.water_saved_liters;
                }
                _ => {}
            }
        }
        stats
    }
}
