// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Coordinates and great-circle distance.

use geo::{coord, Rect};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Mean Earth radius used by every distance calculation in the service.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the map, optionally with a human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
        }
    }

    /// True when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        valid_coordinates(self.latitude, self.longitude)
    }

    /// Haversine distance in kilometers to another location.
    pub fn distance_km(&self, other: &Location) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Check latitude/longitude ranges.
pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Round a distance to 2 decimal places for display.
pub fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}

/// Coarse lat/lng box guaranteed to contain every point within `radius_km` of the origin.
///
/// Used only as a prefilter; callers still apply [`haversine_km`]. Near the poles the
/// longitude span degenerates to the full range.
pub fn bounding_box(latitude: f64, longitude: f64, radius_km: f64) -> Rect<f64> {
    let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
    let min_lat = (latitude - lat_delta).max(-90.0);
    let max_lat = (latitude + lat_delta).min(90.0);

    // Widest longitude offset of the spherical cap: asin(sin δ / cos φ).
    let angular = radius_km / EARTH_RADIUS_KM;
    let cos_lat = latitude.to_radians().cos();
    let ratio = angular.sin() / cos_lat;
    let (min_lng, max_lng) = if angular >= std::f64::consts::FRAC_PI_2
        || ratio >= 1.0
        || min_lat <= -90.0
        || max_lat >= 90.0
    {
        (-180.0, 180.0)
    } else {
        let lng_delta = ratio.asin().to_degrees();
        (longitude - lng_delta, longitude + lng_delta)
    };

    Rect::new(
        coord! { x: min_lng, y: min_lat },
        coord! { x: max_lng, y: max_lat },
    )
}

/// Whether a point falls inside a bounding box built by [`bounding_box`].
///
/// Handles boxes that cross the antimeridian (min/max longitude outside ±180).
pub fn bounds_contain(bounds: &Rect<f64>, latitude: f64, longitude: f64) -> bool {
    let (min, max) = (bounds.min(), bounds.max());
    if latitude < min.y || latitude > max.y {
        return false;
    }
    let candidates = [longitude, longitude - 360.0, longitude + 360.0];
    candidates.iter().any(|lng| *lng >= min.x && *lng <= max.x)
}
