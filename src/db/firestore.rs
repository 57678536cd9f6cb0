// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Firestore client wrapper implementing the listing store and user directory.
//!
//! Provides:
//! - Listings (one document per listing, conditional writes in transactions)
//! - Users (profile documents, stats counters)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::{FirestoreConsistencySelector, FirestoreQueryDirection};
use geo::Rect;

use super::{
    collections, rank_by_impact, ListingPatch, ListingQuery, ListingStore, Precondition,
    SortDirection, UserDirectory,
};
use crate::error::AppError;
use crate::models::location::bounds_contain;
use crate::models::{Listing, NewListing, StatsDelta, UserProfile, UserRole};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // Emulator connections skip credential discovery entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJwYW50cnlzaGFyZSJ9."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Delete a listing document outright. Only used to clean up test data.
    pub async fn purge_listing(&self, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::LISTINGS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

// ─── Listing Operations ──────────────────────────────────────

#[async_trait]
impl ListingStore for FirestoreDb {
    async fn create(
        &self,
        input: NewListing,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Listing, AppError> {
        let listing = Listing::from_new(uuid::Uuid::new_v4().to_string(), input, owner_id, now);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::LISTINGS)
            .document_id(&listing.id)
            .object(&listing)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(listing)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Listing>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LISTINGS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn query(&self, query: &ListingQuery) -> Result<Vec<Listing>, AppError> {
        let filter = query.filter.clone();
        let direction = match query.direction {
            SortDirection::Asc => FirestoreQueryDirection::Ascending,
            SortDirection::Desc => FirestoreQueryDirection::Descending,
        };

        let mut select = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LISTINGS)
            .filter(move |q| {
                q.for_all([
                    filter.active.and_then(|active| q.field("is_active").eq(active)),
                    filter
                        .status
                        .and_then(|status| q.field("status").eq(status.as_str())),
                    filter
                        .category
                        .and_then(|category| q.field("category").eq(category.as_str())),
                    filter
                        .owner_id
                        .as_ref()
                        .and_then(|owner| q.field("owner_id").eq(owner.clone())),
                    filter
                        .volunteer_id
                        .as_ref()
                        .and_then(|volunteer| q.field("volunteer_id").eq(volunteer.clone())),
                ])
            })
            .order_by([(query.sort.field_path(), direction)]);

        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }
        if query.offset > 0 {
            select = select.offset(query.offset);
        }

        select
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read, check and write inside one Firestore transaction.
    ///
    /// The transactional read locks the document, so two concurrent claims
    /// serialize and the second observes the first one's status.
    async fn atomic_update(
        &self,
        id: &str,
        precondition: Precondition,
        patch: &ListingPatch,
    ) -> Result<bool, AppError> {
        let client = self.get_client()?;
        let paths = patch.field_paths();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let tx_client = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        // 1. Read the listing within the transaction
        let current: Option<Listing> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::LISTINGS)
            .obj()
            .one(id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read listing in transaction: {}", e))
            })?;

        // 2. Check the precondition against the locked snapshot
        let mut listing = match current {
            Some(listing) if precondition.holds(&listing) => listing,
            _ => {
                let _ = transaction.rollback().await;
                return Ok(false);
            }
        };
        if paths.is_empty() {
            let _ = transaction.rollback().await;
            return Ok(true);
        }

        // 3. Write only the patched fields
        patch.apply(&mut listing);
        client
            .fluent()
            .update()
            .fields(paths)
            .in_col(collections::LISTINGS)
            .document_id(id)
            .object(&listing)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add listing to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(true)
    }
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl UserDirectory for FirestoreDb {
    async fn get_by_id(&self, id: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Firestore cannot range-filter on two fields, so the role/active
    /// predicate runs server side and the bounding box runs here.
    async fn query_by_role_and_bounds(
        &self,
        roles: &[UserRole],
        bounds: Rect<f64>,
    ) -> Result<Vec<UserProfile>, AppError> {
        let roles: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();

        let users: Vec<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                q.for_all([
                    q.field("is_active").eq(true),
                    q.field("role").is_in(roles.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users
            .into_iter()
            .filter(|user| {
                user.location
                    .as_ref()
                    .is_some_and(|loc| bounds_contain(&bounds, loc.latitude, loc.longitude))
            })
            .collect())
    }

    async fn increment_stats(&self, id: &str, delta: StatsDelta) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let tx_client = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let current: Option<UserProfile> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read user in transaction: {}", e))
            })?;

        let Some(mut user) = current else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("User {}", id)));
        };
        user.stats.apply(&delta);

        client
            .fluent()
            .update()
            .fields(["stats"])
            .in_col(collections::USERS)
            .document_id(id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add stats to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Needs the composite index (`is_active`, `stats.impact_score` desc).
    async fn top_by_impact(&self, limit: u32) -> Result<Vec<UserProfile>, AppError> {
        let mut users: Vec<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("is_active").eq(true)]))
            .order_by([("stats.impact_score", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        // Firestore breaks ties by document name in the sort direction.
        rank_by_impact(&mut users);
        Ok(users)
    }

    async fn user_count(&self) -> Result<u64, AppError> {
        let users: Vec<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.len() as u64)
    }
}
