// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::{DateTime, Duration, TimeZone, Utc};
use pantryshare::config::Config;
use pantryshare::db::{FirestoreDb, MemoryDb, UserDirectory};
use pantryshare::middleware::auth::create_jwt;
use pantryshare::models::{FoodCategory, Location, NewListing, PickupWindow, UserProfile, UserRole};
use pantryshare::routes::create_router;
use pantryshare::time_utils::ManualClock;
use pantryshare::AppState;
use serde_json::Value;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Fixed start time for tests: Monday 2026-06-01 08:00 UTC.
#[allow(dead_code)]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
}

/// App wired over the in-memory store with a manual clock.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub clock: Arc<ManualClock>,
}

#[allow(dead_code)]
impl TestApp {
    /// Signed token for a user with the test signing key.
    pub fn token(&self, user_id: &str, role: UserRole) -> String {
        create_jwt(user_id, role, &self.state.config.jwt_signing_key)
            .expect("Failed to create test JWT")
    }

    pub async fn seed_user(&self, profile: UserProfile) {
        self.db
            .upsert(&profile)
            .await
            .expect("Failed to seed user");
    }

    pub async fn user(&self, id: &str) -> UserProfile {
        self.db
            .get_by_id(id)
            .await
            .expect("Failed to read user")
            .expect("User not found")
    }
}

/// Create a test app with offline in-memory dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let db = MemoryDb::new();
    let clock = Arc::new(ManualClock::new(base_time()));
    let state = Arc::new(AppState::new(
        Config::test_default(),
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        clock.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        clock,
    }
}

/// 5 kg of produce in lower Manhattan, pickup 1h-3h from `now`, expiring in 6h.
#[allow(dead_code)]
pub fn sample_listing(now: DateTime<Utc>) -> NewListing {
    NewListing {
        title: "Surplus apples".to_string(),
        description: "Two crates of slightly bruised apples".to_string(),
        category: FoodCategory::Produce,
        quantity: 5.0,
        unit: "kg".to_string(),
        location: Location::new(40.7128, -74.0060),
        expiry_date: now + Duration::hours(6),
        pickup_window: PickupWindow {
            start: now + Duration::hours(1),
            end: now + Duration::hours(3),
        },
        allergens: Default::default(),
        special_instructions: None,
    }
}

/// A named user profile at a location.
#[allow(dead_code)]
pub fn profile(id: &str, role: UserRole, latitude: f64, longitude: f64) -> UserProfile {
    let mut profile = UserProfile::new(id, role).with_location(latitude, longitude);
    profile.first_name = format!("First-{}", id);
    profile.last_name = format!("Last-{}", id);
    profile
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
