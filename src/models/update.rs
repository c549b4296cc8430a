// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ingested device samples and the append-only update record.

use crate::models::AccountId;
use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A GPS fix reported by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocationData {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// 1-sigma uncertainty in meters
    #[validate(range(min = 0.0))]
    pub accuracy: f64,
    /// Reverse-geocoded address, if the device resolved one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl LocationData {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            address: None,
        }
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Great-circle distance in meters to another sample (accuracy ignored).
    pub fn distance_to(&self, other: &LocationData) -> f64 {
        self.distance_to_point(other.point())
    }

    pub fn distance_to_point(&self, point: Point<f64>) -> f64 {
        Haversine.distance(self.point(), point)
    }

    fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite() && self.accuracy.is_finite()
    }
}

/// Battery reading reported alongside (or instead of) a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BatteryData {
    #[validate(range(min = 0, max = 100))]
    pub level: i32,
    pub charging: bool,
}

/// Raw payload of a single ingest call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub location: Option<LocationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub battery: Option<BatteryData>,
}

impl UpdateData {
    /// Reject malformed samples before any derived processing runs.
    pub fn ensure_valid(&self) -> Result<(), String> {
        if let Some(location) = &self.location {
            if !location.is_finite() {
                return Err("location coordinates and accuracy must be finite".to_string());
            }
        }

        self.validate().map_err(|e| e.to_string())
    }
}

/// Append-only history record, one per successful ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: String,
    pub account_id: AccountId,
    pub created: DateTime<Utc>,
    pub data: UpdateData,
}
