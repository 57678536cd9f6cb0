// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Dashboard endpoint tests: platform totals and the impact leaderboard.

use axum::http::StatusCode;
use pantryshare::models::{ListingStatus, UserRole};
use pantryshare::services::Actor;
use pantryshare::time_utils::Clock;
use serde_json::Value;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, profile, request, sample_listing, TestApp};

/// One delivered, one claimed, one available and one deleted listing, all
/// owned by `donor-1`. `vol-a` delivered the 5 kg one.
async fn app_with_history() -> TestApp {
    let app = create_test_app();
    app.seed_user(profile("donor-1", UserRole::Student, 40.7128, -74.0060))
        .await;
    app.seed_user(profile("vol-a", UserRole::Volunteer, 40.7228, -74.0060))
        .await;
    app.seed_user(profile("vol-b", UserRole::Volunteer, 40.7428, -74.0060))
        .await;
    let mut retired = profile("retired", UserRole::Volunteer, 40.7, -74.0);
    retired.is_active = false;
    retired.stats.impact_score = 999;
    app.seed_user(retired).await;

    let now = app.clock.now();
    let listings = &app.state.listings;
    let donor = Actor::user("donor-1", UserRole::Student);
    let vol_a = Actor::user("vol-a", UserRole::Volunteer);
    let vol_b = Actor::user("vol-b", UserRole::Volunteer);

    let delivered = listings
        .create_listing(sample_listing(now), &donor)
        .await
        .unwrap();
    listings.claim_listing(&delivered.id, &vol_a).await.unwrap();
    listings
        .update_listing_status(&delivered.id, ListingStatus::Delivered, &donor, None)
        .await
        .unwrap();

    let claimed = listings
        .create_listing(sample_listing(now), &donor)
        .await
        .unwrap();
    listings.claim_listing(&claimed.id, &vol_b).await.unwrap();

    listings
        .create_listing(sample_listing(now), &donor)
        .await
        .unwrap();

    let withdrawn = listings
        .create_listing(sample_listing(now), &donor)
        .await
        .unwrap();
    listings.delete_listing(&withdrawn.id, &donor).await.unwrap();

    app
}

async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(request("GET", uri, token, None))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_platform_stats_are_public() {
    let app = app_with_history().await;

    let (status, body) = get(&app, "/api/dashboard/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let stats = &body["data"];
    // The deleted listing is not counted
    assert_eq!(stats["total_listings"], 3);
    assert_eq!(stats["total_users"], 4);
    assert_eq!(stats["active_listings"], 1);
    assert_eq!(stats["completed_listings"], 1);
    // 5 kg -> 10 meals
    assert_eq!(stats["total_meals_rescued"], 10);
    assert_eq!(stats["total_co2_saved_kg"], 25.0);
    assert_eq!(stats["total_water_saved_liters"], 250.0);
}

#[tokio::test]
async fn test_platform_stats_on_empty_platform() {
    let app = create_test_app();
    let (status, body) = get(&app, "/api/dashboard/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_listings"], 0);
    assert_eq!(body["data"]["total_meals_rescued"], 0);
}

#[tokio::test]
async fn test_leaderboard_ranks_active_users_by_impact() {
    let app = app_with_history().await;
    let token = app.token("vol-b", UserRole::Volunteer);

    let (status, body) = get(&app, "/api/dashboard/leaderboard", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap())
        .collect();
    // Inactive users never appear; equal scores fall back to id order.
    assert_eq!(ids, vec!["vol-a", "donor-1", "vol-b"]);

    let top = &body["data"][0];
    // 5 kg of produce x 1.5
    assert_eq!(top["impact_score"], 8);
    assert_eq!(top["total_pickups"], 1);
    assert_eq!(top["total_deliveries"], 1);
    assert_eq!(top["name"], "First-vol-a Last-vol-a");
    assert_eq!(body["data"][1]["total_listings"], 4);

    let (_, body) = get(&app, "/api/dashboard/leaderboard?limit=1", Some(&token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_leaderboard_validates_limit_and_requires_auth() {
    let app = app_with_history().await;
    let token = app.token("vol-b", UserRole::Volunteer);

    let (status, body) = get(&app, "/api/dashboard/leaderboard?limit=0", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "limit");

    let (status, body) = get(&app, "/api/dashboard/leaderboard?limit=ten", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/dashboard/leaderboard", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
