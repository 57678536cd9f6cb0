// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Listing state machine.
//!
//! ```text
//! available ──claim──▶ claimed ──mark_in_transit──▶ in_transit
//!     │                   │                             │
//!     │                   ├──mark_delivered─────────────┴──▶ delivered
//!     ├──cancel───────────┴──cancel──▶ cancelled
//!     └──expire (sweep)──▶ expired
//! ```
//!
//! Every status write goes through [`ListingStore::atomic_update`] with the
//! observed source status as precondition, so a transition never applies on
//! top of a state it did not check.

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::fmt;
use std::sync::Arc;

use super::hooks::{CommitEffect, ListingEvent};
use super::impact::impact_score;
use crate::db::{ListingFilter, ListingPatch, ListingQuery, ListingStore, Precondition};
use crate::error::{AppError, Result};
use crate::models::{Listing, ListingStatus, StatsDelta, UserRole};
use crate::time_utils::Clock;

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// A lifecycle event that moves a listing between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Claim,
    MarkInTransit,
    MarkDelivered,
    Cancel,
    Expire,
}

impl LifecycleEvent {
    pub fn name(self) -> &'static str {
        match self {
            LifecycleEvent::Claim => "claim",
            LifecycleEvent::MarkInTransit => "mark in transit",
            LifecycleEvent::MarkDelivered => "mark delivered",
            LifecycleEvent::Cancel => "cancel",
            LifecycleEvent::Expire => "expire",
        }
    }

    pub fn target(self) -> ListingStatus {
        match self {
            LifecycleEvent::Claim => ListingStatus::Claimed,
            LifecycleEvent::MarkInTransit => ListingStatus::InTransit,
            LifecycleEvent::MarkDelivered => ListingStatus::Delivered,
            LifecycleEvent::Cancel => ListingStatus::Cancelled,
            LifecycleEvent::Expire => ListingStatus::Expired,
        }
    }

    /// Source states from which this event is defined.
    pub fn sources(self) -> &'static [ListingStatus] {
        match self {
            LifecycleEvent::Claim | LifecycleEvent::Expire => &[ListingStatus::Available],
            LifecycleEvent::MarkInTransit => &[ListingStatus::Claimed],
            LifecycleEvent::MarkDelivered => &[ListingStatus::Claimed, ListingStatus::InTransit],
            LifecycleEvent::Cancel => &[ListingStatus::Available, ListingStatus::Claimed],
        }
    }

    pub fn allowed_from(self, from: ListingStatus) -> bool {
        self.sources().contains(&from)
    }

    /// Event that moves a listing to `status`, if any.
    pub fn for_target(status: ListingStatus) -> Option<Self> {
        match status {
            ListingStatus::Claimed => Some(LifecycleEvent::Claim),
            ListingStatus::InTransit => Some(LifecycleEvent::MarkInTransit),
            ListingStatus::Delivered => Some(LifecycleEvent::MarkDelivered),
            ListingStatus::Cancelled => Some(LifecycleEvent::Cancel),
            ListingStatus::Expired => Some(LifecycleEvent::Expire),
            ListingStatus::Available => None,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Who is asking for a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    User { id: String, role: UserRole },
    /// Scheduled maintenance.
    System,
}

impl Actor {
    pub fn user(id: impl Into<String>, role: UserRole) -> Self {
        Actor::User {
            id: id.into(),
            role,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Actor::User { id, .. } => Some(id),
            Actor::System => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::User { role, .. } if role.is_admin())
    }

    pub fn has_role(&self, wanted: UserRole) -> bool {
        matches!(self, Actor::User { role, .. } if *role == wanted)
    }
}

/// Per-event actor authorization.
pub fn can_transition(actor: &Actor, listing: &Listing, event: LifecycleEvent) -> bool {
    let Actor::User { id, role } = actor else {
        return event == LifecycleEvent::Expire;
    };
    let owner = listing.is_owned_by(id);
    let volunteer = listing.is_volunteer(id);

    match event {
        LifecycleEvent::Claim => !owner,
        LifecycleEvent::MarkInTransit => owner || volunteer,
        LifecycleEvent::MarkDelivered => owner || volunteer || role.is_admin(),
        LifecycleEvent::Cancel => owner || role.is_admin(),
        LifecycleEvent::Expire => false,
    }
}

/// A committed transition and the side effects it owes.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub listing: Listing,
    pub effects: Vec<CommitEffect>,
}

/// Result of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SweepReport {
    /// Available listings inspected.
    pub scanned: usize,
    /// Ids moved to `expired` by this run.
    pub expired: Vec<String>,
    /// Listings whose write failed; they are retried on the next run.
    pub failed: usize,
}

/// Drives listings through the state machine.
#[derive(Clone)]
pub struct ListingLifecycle {
    store: Arc<dyn ListingStore>,
    clock: Arc<dyn Clock>,
}

impl ListingLifecycle {
    pub fn new(store: Arc<dyn ListingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn load(&self, id: &str) -> Result<Listing> {
        self.store
            .get_by_id(id)
            .await?
            .filter(|listing| listing.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Listing {}", id)))
    }

    /// Reserve an available listing for `actor`.
    ///
    /// Among concurrent claims on one listing exactly one succeeds; the rest
    /// fail with `Conflict`.
    pub async fn claim(&self, listing_id: &str, actor: &Actor) -> Result<TransitionOutcome> {
        let listing = self.load(listing_id).await?;

        let volunteer_id = match actor {
            Actor::User { id, .. } if !listing.is_owned_by(id) => id.clone(),
            Actor::User { .. } => {
                return Err(AppError::Unauthorized(
                    "Cannot claim your own listing".to_string(),
                ))
            }
            Actor::System => {
                return Err(AppError::Unauthorized(
                    "Only users can claim listings".to_string(),
                ))
            }
        };

        if listing.status != ListingStatus::Available {
            return Err(not_available());
        }
        let now = self.clock.now();
        if listing.pickup_window.has_lapsed(now) {
            return Err(AppError::Conflict(
                "Pickup window has already ended".to_string(),
            ));
        }

        let patch = ListingPatch {
            status: Some(ListingStatus::Claimed),
            volunteer_id: Some(volunteer_id.clone()),
            claimed_at: Some(now),
            updated_at: Some(now),
            increment_claim_count: true,
            ..Default::default()
        };
        let applied = self
            .store
            .atomic_update(
                listing_id,
                Precondition::Status(ListingStatus::Available),
                &patch,
            )
            .await?;
        if !applied {
            tracing::debug!(listing_id, volunteer_id = %volunteer_id, "Claim lost to a concurrent update");
            return Err(not_available());
        }

        let mut claimed = listing;
        patch.apply(&mut claimed);

        tracing::info!(
            listing_id,
            owner_id = %claimed.owner_id,
            volunteer_id = %volunteer_id,
            "Listing claimed"
        );

        let effects = vec![
            CommitEffect::Stats {
                user_id: volunteer_id.clone(),
                delta: StatsDelta::pickup(),
            },
            CommitEffect::Event(ListingEvent::ListingClaimed {
                listing_id: claimed.id.clone(),
                owner_id: claimed.owner_id.clone(),
                volunteer_id,
            }),
        ];
        Ok(TransitionOutcome {
            listing: claimed,
            effects,
        })
    }

    pub async fn mark_in_transit(&self, listing_id: &str, actor: &Actor) -> Result<TransitionOutcome> {
        self.transition(listing_id, actor, LifecycleEvent::MarkInTransit, None)
            .await
    }

    pub async fn mark_delivered(&self, listing_id: &str, actor: &Actor) -> Result<TransitionOutcome> {
        self.transition(listing_id, actor, LifecycleEvent::MarkDelivered, None)
            .await
    }

    pub async fn cancel(
        &self,
        listing_id: &str,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<TransitionOutcome> {
        self.transition(listing_id, actor, LifecycleEvent::Cancel, reason)
            .await
    }

    /// Expire a single listing whose expiry date has passed.
    pub async fn expire(&self, listing_id: &str, actor: &Actor) -> Result<TransitionOutcome> {
        self.transition(listing_id, actor, LifecycleEvent::Expire, None)
            .await
    }

    /// Apply any non-claim event.
    pub async fn transition(
        &self,
        listing_id: &str,
        actor: &Actor,
        event: LifecycleEvent,
        reason: Option<String>,
    ) -> Result<TransitionOutcome> {
        if event == LifecycleEvent::Claim {
            return self.claim(listing_id, actor).await;
        }

        let listing = self.load(listing_id).await?;
        if !event.allowed_from(listing.status) {
            return Err(AppError::InvalidTransition {
                from: listing.status,
                event: event.name(),
            });
        }
        if !can_transition(actor, &listing, event) {
            return Err(AppError::Unauthorized(format!(
                "Not allowed to {} this listing",
                event
            )));
        }

        let now = self.clock.now();
        if event == LifecycleEvent::Expire && listing.expiry_date > now {
            return Err(AppError::Conflict(
                "Listing has not reached its expiry date".to_string(),
            ));
        }

        let precondition = match event {
            LifecycleEvent::Expire => Precondition::ExpiredBy(now),
            _ => Precondition::Status(listing.status),
        };
        let patch = transition_patch(event, now, reason);
        let applied = self
            .store
            .atomic_update(listing_id, precondition, &patch)
            .await?;
        if !applied {
            // Another writer moved the listing first; report against its state now.
            let current = self.load(listing_id).await?;
            return Err(AppError::InvalidTransition {
                from: current.status,
                event: event.name(),
            });
        }

        let from = listing.status;
        let mut updated = listing;
        patch.apply(&mut updated);

        tracing::info!(
            listing_id,
            from = %from,
            to = %updated.status,
            actor_id = actor.user_id(),
            "Listing status updated"
        );

        let mut effects = Vec::new();
        if event == LifecycleEvent::MarkDelivered {
            if let Some(volunteer_id) = &updated.volunteer_id {
                effects.push(CommitEffect::Stats {
                    user_id: volunteer_id.clone(),
                    delta: StatsDelta::delivery(impact_score(&updated)),
                });
            }
        }
        effects.push(CommitEffect::Event(ListingEvent::ListingStatusUpdated {
            listing_id: updated.id.clone(),
            status: updated.status,
            actor_id: actor.user_id().map(str::to_string),
        }));

        Ok(TransitionOutcome {
            listing: updated,
            effects,
        })
    }

    /// Move every available listing whose expiry date has passed to `expired`.
    ///
    /// Safe to re-run: listings already expired are no longer `available` and
    /// the conditional write skips any listing claimed or extended in the meantime.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let available = self
            .store
            .query(&ListingQuery::new(ListingFilter::available()))
            .await?;
        let scanned = available.len();

        let lapsed: Vec<String> = available
            .into_iter()
            .filter(|listing| listing.expiry_date <= now)
            .map(|listing| listing.id)
            .collect();

        let patch = transition_patch(LifecycleEvent::Expire, now, None);
        let results: Vec<(String, Result<bool>)> = stream::iter(lapsed)
            .map(|id| {
                let patch = &patch;
                async move {
                    let result = self
                        .store
                        .atomic_update(&id, Precondition::ExpiredBy(now), patch)
                        .await;
                    (id, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut report = SweepReport {
            scanned,
            ..Default::default()
        };
        for (id, result) in results {
            match result {
                Ok(true) => report.expired.push(id),
                Ok(false) => {
                    tracing::debug!(listing_id = %id, "Listing changed before it could expire")
                }
                Err(e) => {
                    tracing::warn!(listing_id = %id, error = %e, "Failed to expire listing");
                    report.failed += 1;
                }
            }
        }
        report.expired.sort();

        tracing::info!(
            scanned = report.scanned,
            expired = report.expired.len(),
            failed = report.failed,
            "Expiry sweep finished"
        );
        Ok(report)
    }
}

fn not_available() -> AppError {
    AppError::Conflict("Listing is not available".to_string())
}

/// Fields written by each non-claim transition.
fn transition_patch(event: LifecycleEvent, now: DateTime<Utc>, reason: Option<String>) -> ListingPatch {
    let mut patch = ListingPatch {
        status: Some(event.target()),
        updated_at: Some(now),
        ..Default::default()
    };
    match event {
        LifecycleEvent::Claim => {}
        LifecycleEvent::MarkInTransit => patch.pickup_at = Some(now),
        LifecycleEvent::MarkDelivered => patch.delivered_at = Some(now),
        LifecycleEvent::Cancel => {
            patch.cancelled_at = Some(now);
            patch.cancellation_reason = reason;
            patch.clear_volunteer = true;
        }
        LifecycleEvent::Expire => patch.expired_at = Some(now),
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_match_transition_table() {
        use ListingStatus::*;
        let table = [
            (LifecycleEvent::Claim, vec![Available]),
            (LifecycleEvent::MarkInTransit, vec![Claimed]),
            (LifecycleEvent::MarkDelivered, vec![Claimed, InTransit]),
            (LifecycleEvent::Cancel, vec![Available, Claimed]),
            (LifecycleEvent::Expire, vec![Available]),
        ];
        for (event, sources) in table {
            for status in ListingStatus::ALL {
                assert_eq!(
                    event.allowed_from(status),
                    sources.contains(&status),
                    "{} from {}",
                    event,
                    status
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let events = [
            LifecycleEvent::Claim,
            LifecycleEvent::MarkInTransit,
            LifecycleEvent::MarkDelivered,
            LifecycleEvent::Cancel,
            LifecycleEvent::Expire,
        ];
        for status in ListingStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(events.iter().all(|e| !e.allowed_from(status)));
        }
    }

    #[test]
    fn test_for_target() {
        assert_eq!(
            LifecycleEvent::for_target(ListingStatus::Delivered),
            Some(LifecycleEvent::MarkDelivered)
        );
        assert_eq!(LifecycleEvent::for_target(ListingStatus::Available), None);
    }

    #[test]
    fn test_cancel_patch_detaches_volunteer() {
        let now = Utc::now();
        let patch = transition_patch(LifecycleEvent::Cancel, now, Some("Spoiled".to_string()));
        assert!(patch.clear_volunteer);
        assert_eq!(patch.status, Some(ListingStatus::Cancelled));
        assert_eq!(patch.cancellation_reason.as_deref(), Some("Spoiled"));
    }

    #[test]
    fn test_system_actor_may_only_expire() {
        assert!(!Actor::System.is_admin());
        assert_eq!(Actor::System.user_id(), None);
        assert!(Actor::user("a", UserRole::SuperAdmin).is_admin());
        assert!(Actor::user("v", UserRole::Volunteer).has_role(UserRole::Volunteer));
        assert!(!Actor::user("s", UserRole::Student).has_role(UserRole::Volunteer));
        assert!(!Actor::System.has_role(UserRole::Volunteer));
    }
}
