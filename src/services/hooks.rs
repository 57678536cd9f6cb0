// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Post-commit side effects.
//!
//! A committed transition yields a list of [`CommitEffect`]s. The orchestrator
//! hands them to every registered [`PostCommitHook`] once the primary write
//! has succeeded. Hook failures are logged and never reach the caller.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::db::UserDirectory;
use crate::error::Result;
use crate::models::{Listing, ListingStatus, StatsDelta};

/// Real-time notification published after a committed change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListingEvent {
    NewListing {
        listing: Box<Listing>,
    },
    ListingUpdated {
        listing: Box<Listing>,
    },
    ListingClaimed {
        listing_id: String,
        owner_id: String,
        volunteer_id: String,
    },
    ListingStatusUpdated {
        listing_id: String,
        status: ListingStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor_id: Option<String>,
    },
    ListingDeleted {
        listing_id: String,
    },
    VolunteerMatched {
        listing_id: String,
        volunteer_id: String,
        distance_km: f64,
    },
    ListingsExpired {
        listing_ids: Vec<String>,
    },
}

impl ListingEvent {
    /// SSE event name; matches the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            ListingEvent::NewListing { .. } => "new_listing",
            ListingEvent::ListingUpdated { .. } => "listing_updated",
            ListingEvent::ListingClaimed { .. } => "listing_claimed",
            ListingEvent::ListingStatusUpdated { .. } => "listing_status_updated",
            ListingEvent::ListingDeleted { .. } => "listing_deleted",
            ListingEvent::VolunteerMatched { .. } => "volunteer_matched",
            ListingEvent::ListingsExpired { .. } => "listings_expired",
        }
    }
}

/// Best-effort work to run after a transition commits.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitEffect {
    Stats { user_id: String, delta: StatsDelta },
    Event(ListingEvent),
}

#[async_trait]
pub trait PostCommitHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handle one effect. Effects a hook does not care about are ignored.
    async fn on_commit(&self, effect: &CommitEffect) -> Result<()>;
}

/// Applies stats increments to the user directory.
pub struct StatsHook {
    directory: Arc<dyn UserDirectory>,
}

impl StatsHook {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl PostCommitHook for StatsHook {
    fn name(&self) -> &'static str {
        "stats"
    }

    async fn on_commit(&self, effect: &CommitEffect) -> Result<()> {
        if let CommitEffect::Stats { user_id, delta } = effect {
            self.directory.increment_stats(user_id, *delta).await?;
        }
        Ok(())
    }
}

/// In-process fan-out of [`ListingEvent`]s to SSE subscribers.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<ListingEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// No-op when nobody is listening.
    pub fn publish(&self, event: ListingEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListingEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostCommitHook for EventHub {
    fn name(&self) -> &'static str {
        "events"
    }

    async fn on_commit(&self, effect: &CommitEffect) -> Result<()> {
        if let CommitEffect::Event(event) = effect {
            self.publish(event.clone());
        }
        Ok(())
    }
}

/// Ordered hook list run by the orchestrator.
#[derive(Clone, Default)]
pub struct PostCommitHooks {
    hooks: Vec<Arc<dyn PostCommitHook>>,
}

impl PostCommitHooks {
    pub fn new(hooks: Vec<Arc<dyn PostCommitHook>>) -> Self {
        Self { hooks }
    }

    /// Run every hook over every effect, isolating failures.
    pub async fn run(&self, effects: &[CommitEffect]) {
        for effect in effects {
            for hook in &self.hooks {
                if let Err(e) = hook.on_commit(effect).await {
                    tracing::warn!(
                        hook = hook.name(),
                        effect = ?effect,
                        error = %e,
                        "Post-commit hook failed"
                    );
                }
            }
        }
    }
}
