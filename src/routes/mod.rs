// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! HTTP route handlers.

pub mod dashboard;
pub mod listings;
pub mod tasks;
pub mod volunteers;

use crate::error::{AppError, Result};
use crate::middleware::{require_auth, require_tasks_auth};
use crate::services::GeoFilter;
use crate::AppState;
use axum::http::{header, Method};
use axum::{extract::Query, middleware, routing::get, Json, Router};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

/// JSON body extractor whose rejections use the error envelope.
pub(crate) type ApiJson<T> = WithRejection<Json<T>, AppError>;

/// Query string extractor whose rejections use the error envelope.
pub(crate) type ApiQuery<T> = WithRejection<Query<T>, AppError>;

/// Build an optional distance filter from query parameters.
/// Latitude and longitude must be given together.
pub(crate) fn geo_filter(
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius_km: Option<f64>,
) -> Result<Option<GeoFilter>> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(Some(GeoFilter {
            latitude,
            longitude,
            radius_km,
        })),
        (None, None) => Ok(None),
        (None, Some(_)) => Err(AppError::validation(
            "lat",
            "lat and lng must be supplied together",
        )),
        (Some(_), None) => Err(AppError::validation(
            "lng",
            "lat and lng must be supplied together",
        )),
    }
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(listings::public_routes())
        .merge(dashboard::public_routes());

    // Maintenance routes (scheduler token required)
    let task_routes = tasks::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_tasks_auth,
    ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .merge(listings::protected_routes())
        .merge(volunteers::routes())
        .merge(dashboard::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(task_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
