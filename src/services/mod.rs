// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Services module - business logic layer.

pub mod hooks;
pub mod impact;
pub mod lifecycle;
pub mod listing;
pub mod matcher;
pub mod volunteer;

pub use hooks::{CommitEffect, EventHub, ListingEvent, PostCommitHook, PostCommitHooks, StatsHook};
pub use impact::{ImpactEstimate, PlatformStats, UserImpactSummary};
pub use lifecycle::{can_transition, Actor, LifecycleEvent, ListingLifecycle, SweepReport};
pub use listing::{
    GeoFilter, LeaderboardEntry, ListingSearch, ListingService, SearchLimits, UserSummary,
};
pub use matcher::{VolunteerMatch, VolunteerMatcher};
pub use volunteer::{VolunteerService, VolunteerStats};
