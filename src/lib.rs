// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! PantryShare: surplus food rescue marketplace backend.
//!
//! Donors post listings of surplus food, volunteers claim and deliver them,
//! and every completed pickup is credited with an impact estimate.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{ListingStore, UserDirectory};
use services::{
    EventHub, ListingService, PostCommitHooks, SearchLimits, StatsHook, VolunteerService,
};
use std::sync::Arc;
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub listings: ListingService,
    pub volunteers: VolunteerService,
    pub events: EventHub,
}

impl AppState {
    /// Wire the services over the given stores.
    ///
    /// Post-commit hooks run in order: stats first, then the event fan-out.
    pub fn new(
        config: Config,
        store: Arc<dyn ListingStore>,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = EventHub::new();
        let hooks = PostCommitHooks::new(vec![
            Arc::new(StatsHook::new(directory.clone())),
            Arc::new(events.clone()),
        ]);
        let limits = SearchLimits::from(&config);

        let listings = ListingService::new(
            store.clone(),
            directory.clone(),
            clock,
            hooks.clone(),
            limits,
        );
        let volunteers = VolunteerService::new(store, directory, hooks, limits);

        Self {
            config,
            listings,
            volunteers,
            events,
        }
    }
}
