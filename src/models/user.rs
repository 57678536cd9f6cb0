// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! User profile fields the listing core reads and the stats it maintains.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::location::Location;

/// Default travel distance for new volunteers (km).
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 10.0;

/// Platform role, carried in the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum UserRole {
    Student,
    Volunteer,
    ShelterAdmin,
    SchoolAdmin,
    SuperAdmin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Volunteer => "volunteer",
            UserRole::ShelterAdmin => "shelter_admin",
            UserRole::SchoolAdmin => "school_admin",
            UserRole::SuperAdmin => "super_admin",
        }
    }

    /// Shelter, school and super admins may act on any listing.
    pub fn is_admin(self) -> bool {
        matches!(
            self,
            UserRole::ShelterAdmin | UserRole::SchoolAdmin | UserRole::SuperAdmin
        )
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "volunteer" => Ok(UserRole::Volunteer),
            "shelter_admin" => Ok(UserRole::ShelterAdmin),
            "school_admin" => Ok(UserRole::SchoolAdmin),
            "super_admin" => Ok(UserRole::SuperAdmin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Weekday tag used in availability preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Volunteer availability preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Availability {
    #[serde(default)]
    pub weekdays: BTreeSet<DayOfWeek>,
    #[serde(default = "default_max_distance")]
    pub max_distance_km: f64,
}

fn default_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE_KM
}

impl Default for Availability {
    /// New accounts are available on weekdays.
    fn default() -> Self {
        Self {
            weekdays: [
                DayOfWeek::Monday,
                DayOfWeek::Tuesday,
                DayOfWeek::Wednesday,
                DayOfWeek::Thursday,
                DayOfWeek::Friday,
            ]
            .into_iter()
            .collect(),
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
        }
    }
}

/// Aggregate counters maintained as side effects of listing transitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStats {
    #[serde(default)]
    pub total_listings: u64,
    #[serde(default)]
    pub total_pickups: u64,
    #[serde(default)]
    pub total_deliveries: u64,
    #[serde(default)]
    pub impact_score: u64,
}

impl UserStats {
    pub fn apply(&mut self, delta: &StatsDelta) {
        self.total_listings += delta.total_listings;
        self.total_pickups += delta.total_pickups;
        self.total_deliveries += delta.total_deliveries;
        self.impact_score += delta.impact_score;
    }
}

/// Increments to apply to a user's [`UserStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDelta {
    pub total_listings: u64,
    pub total_pickups: u64,
    pub total_deliveries: u64,
    pub impact_score: u64,
}

impl StatsDelta {
    pub fn listing_created() -> Self {
        Self {
            total_listings: 1,
            ..Default::default()
        }
    }

    pub fn pickup() -> Self {
        Self {
            total_pickups: 1,
            ..Default::default()
        }
    }

    pub fn delivery(impact_score: u64) -> Self {
        Self {
            total_deliveries: 1,
            impact_score,
            ..Default::default()
        }
    }
}

/// User profile as seen by the listing core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Document ID
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl UserProfile {
    pub fn new(id: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            location: None,
            availability: Availability::default(),
            stats: UserStats::default(),
            is_active: true,
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(Location::new(latitude, longitude));
        self
    }
}

/// A badge earned from accumulated stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub name: &'static str,
    pub description: &'static str,
}

/// Badges unlocked by a user's stats, in display order.
pub fn achievements(stats: &UserStats) -> Vec<Achievement> {
    let mut earned = Vec::new();
    if stats.total_listings >= 1 {
        earned.push(Achievement {
            name: "First Contribution",
            description: "Created your first listing",
        });
    }
    if stats.total_listings >= 10 {
        earned.push(Achievement {
            name: "Active Contributor",
            description: "Created 10 listings",
        });
    }
    if stats.total_pickups >= 5 {
        earned.push(Achievement {
            name: "Helpful Volunteer",
            description: "Completed 5 pickups",
        });
    }
    if stats.impact_score >= 100 {
        earned.push(Achievement {
            name: "Impact Maker",
            description: "Saved 100+ meals",
        });
    }
    earned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_roles() {
        assert!(UserRole::ShelterAdmin.is_admin());
        assert!(UserRole::SchoolAdmin.is_admin());
        assert!(UserRole::SuperAdmin.is_admin());
        assert!(!UserRole::Volunteer.is_admin());
        assert!(!UserRole::Student.is_admin());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("shelter_admin".parse::<UserRole>(), Ok(UserRole::ShelterAdmin));
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_stats_apply_delta() {
        let mut stats = UserStats::default();
        stats.apply(&StatsDelta::listing_created());
        stats.apply(&StatsDelta::pickup());
        stats.apply(&StatsDelta::delivery(8));
        stats.apply(&StatsDelta::delivery(4));

        assert_eq!(stats.total_listings, 1);
        assert_eq!(stats.total_pickups, 1);
        assert_eq!(stats.total_deliveries, 2);
        assert_eq!(stats.impact_score, 12);
    }

    #[test]
    fn test_default_availability_is_weekdays() {
        let availability = Availability::default();
        assert!(availability.weekdays.contains(&DayOfWeek::Friday));
        assert!(!availability.weekdays.contains(&DayOfWeek::Saturday));
        assert_eq!(availability.max_distance_km, DEFAULT_MAX_DISTANCE_KM);
    }

    #[test]
    fn test_achievements_thresholds() {
        assert!(achievements(&UserStats::default()).is_empty());

        let stats = UserStats {
            total_listings: 10,
            total_pickups: 5,
            total_deliveries: 5,
            impact_score: 100,
        };
        let names: Vec<_> = achievements(&stats).iter().map(|a| a.name).collect();
        assert_eq!(
            names,
            vec![
                "First Contribution",
                "Active Contributor",
                "Helpful Volunteer",
                "Impact Maker"
            ]
        );
    }
}
