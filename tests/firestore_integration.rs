// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Firestore store tests. Require the emulator:
//!
//! ```sh
//! gcloud emulators firestore start --host-port=localhost:8081
//! FIRESTORE_EMULATOR_HOST=localhost:8081 cargo test --test firestore_integration
//! ```

use chrono::{Duration, Utc};
use pantryshare::db::{
    FirestoreDb, ListingFilter, ListingPatch, ListingQuery, ListingStore, Precondition,
    SortDirection, SortField, UserDirectory,
};
use pantryshare::error::AppError;
use pantryshare::models::location::bounding_box;
use pantryshare::models::{ListingStatus, StatsDelta, UserRole};
use pantryshare::services::{Actor, ListingLifecycle};
use pantryshare::time_utils::{Clock, ManualClock};
use std::sync::Arc;

mod common;
use common::{profile, sample_listing, test_db};

/// Unique owner per test run so queries never see other runs' data.
fn unique_owner(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_offline_mode_reports_database_error() {
    let db = FirestoreDb::new_mock();
    let err = ListingStore::get_by_id(&db, "anything").await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(err.kind(), "upstream_failure");
}

#[tokio::test]
async fn test_create_and_read_listing() {
    require_emulator!();
    let db = test_db().await;
    let owner = unique_owner("owner");
    let now = Utc::now();

    let created = db.create(sample_listing(now), &owner, now).await.unwrap();
    let fetched = ListingStore::get_by_id(&db, &created.id)
        .await
        .unwrap()
        .expect("listing should exist");

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.owner_id, owner);
    assert_eq!(fetched.status, ListingStatus::Available);
    assert_eq!(fetched.title, created.title);
    assert!(fetched.volunteer_id.is_none());

    db.purge_listing(&created.id).await.unwrap();
}

#[tokio::test]
async fn test_atomic_update_respects_precondition() {
    require_emulator!();
    let db = test_db().await;
    let owner = unique_owner("owner");
    let now = Utc::now();
    let listing = db.create(sample_listing(now), &owner, now).await.unwrap();

    let claim = ListingPatch {
        status: Some(ListingStatus::Claimed),
        volunteer_id: Some("volunteer-a".to_string()),
        claimed_at: Some(now),
        increment_claim_count: true,
        ..Default::default()
    };
    let available = Precondition::Status(ListingStatus::Available);

    assert!(db.atomic_update(&listing.id, available, &claim).await.unwrap());
    assert!(!db.atomic_update(&listing.id, available, &claim).await.unwrap());

    let stored = ListingStore::get_by_id(&db, &listing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ListingStatus::Claimed);
    assert_eq!(stored.volunteer_id.as_deref(), Some("volunteer-a"));
    assert_eq!(stored.claim_count, 1);
    // Untouched fields survive the masked write
    assert_eq!(stored.title, listing.title);

    db.purge_listing(&listing.id).await.unwrap();
}

#[tokio::test]
async fn test_query_filters_sorts_and_pages() {
    require_emulator!();
    let db = test_db().await;
    let owner = unique_owner("owner");
    let now = Utc::now();

    let mut ids = vec![];
    for i in 0..3 {
        let mut input = sample_listing(now);
        input.quantity = (i + 1) as f64;
        ids.push(db.create(input, &owner, now).await.unwrap().id);
    }

    let query = ListingQuery::new(ListingFilter {
        owner_id: Some(owner.clone()),
        ..ListingFilter::available()
    })
    .sorted(SortField::Quantity, SortDirection::Desc)
    .page(2, 0);
    let first_page = db.query(&query).await.unwrap();
    assert_eq!(
        first_page.iter().map(|l| l.quantity).collect::<Vec<_>>(),
        vec![3.0, 2.0]
    );

    let second_page = db.query(&query.clone().page(2, 2)).await.unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].quantity, 1.0);

    for id in ids {
        db.purge_listing(&id).await.unwrap();
    }
}

#[tokio::test]
async fn test_soft_delete_keeps_document() {
    require_emulator!();
    let db = test_db().await;
    let owner = unique_owner("owner");
    let now = Utc::now();
    let listing = db.create(sample_listing(now), &owner, now).await.unwrap();

    let deleted = db
        .soft_delete(
            &listing.id,
            Precondition::Status(ListingStatus::Available),
            now,
        )
        .await
        .unwrap();
    assert!(deleted);

    let stored = ListingStore::get_by_id(&db, &listing.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_active);
    assert!(stored.deleted_at.is_some());
    // Deletion hides the listing without moving its status
    assert_eq!(stored.status, ListingStatus::Available);

    let visible = db
        .query(&ListingQuery::new(ListingFilter {
            owner_id: Some(owner),
            ..ListingFilter::available()
        }))
        .await
        .unwrap();
    assert!(visible.is_empty());

    db.purge_listing(&listing.id).await.unwrap();
}

#[tokio::test]
async fn test_user_directory_roles_bounds_and_stats() {
    require_emulator!();
    let db = test_db().await;
    let volunteer_id = unique_owner("volunteer");
    let student_id = unique_owner("student");

    db.upsert(&profile(&volunteer_id, UserRole::Volunteer, 12.0001, 45.0001))
        .await
        .unwrap();
    db.upsert(&profile(&student_id, UserRole::Student, 12.0002, 45.0002))
        .await
        .unwrap();

    let found = db
        .query_by_role_and_bounds(&[UserRole::Volunteer], bounding_box(12.0, 45.0, 1.0))
        .await
        .unwrap();
    let found_ids: Vec<_> = found.iter().map(|u| u.id.as_str()).collect();
    assert!(found_ids.contains(&volunteer_id.as_str()));
    assert!(!found_ids.contains(&student_id.as_str()));

    db.increment_stats(&volunteer_id, StatsDelta::pickup())
        .await
        .unwrap();
    db.increment_stats(&volunteer_id, StatsDelta::delivery(8))
        .await
        .unwrap();
    let stats = UserDirectory::get_by_id(&db, &volunteer_id)
        .await
        .unwrap()
        .unwrap()
        .stats;
    assert_eq!(stats.total_pickups, 1);
    assert_eq!(stats.total_deliveries, 1);
    assert_eq!(stats.impact_score, 8);

    let err = db
        .increment_stats("no-such-user", StatsDelta::pickup())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_claims_against_firestore() {
    require_emulator!();
    const CLAIMANTS: usize = 8;

    let db = Arc::new(test_db().await);
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let lifecycle = ListingLifecycle::new(db.clone(), clock.clone());
    let owner = unique_owner("owner");
    let now = clock.now();
    let listing = db.create(sample_listing(now), &owner, now).await.unwrap();

    let mut handles = vec![];
    for i in 0..CLAIMANTS {
        let lifecycle = lifecycle.clone();
        let id = listing.id.clone();
        handles.push(tokio::spawn(async move {
            let actor = Actor::user(format!("volunteer-{}", i), UserRole::Volunteer);
            lifecycle.claim(&id, &actor).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.expect("Task join failed") {
            Ok(_) => winners += 1,
            // Contended transactions may abort instead of observing the winner.
            Err(AppError::Conflict(_)) | Err(AppError::Database(_)) => {}
            Err(other) => panic!("unexpected claim error: {:?}", other),
        }
    }
    assert_eq!(winners, 1);

    let stored = ListingStore::get_by_id(db.as_ref(), &listing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ListingStatus::Claimed);
    assert_eq!(stored.claim_count, 1);

    clock.advance(Duration::minutes(1));
    db.purge_listing(&listing.id).await.unwrap();
}
