// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Circular geofence model.

use crate::models::LocationData;
use geo::Point;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub type FenceId = i64;

/// Multiplier applied to the sample accuracy when testing containment.
///
/// Biases toward "inside" so jitter at the boundary does not produce
/// spurious left/entered pairs.
pub const ACCURACY_INCLUSION_FACTOR: f64 = 2.0;

/// A named circular zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Fence {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: FenceId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters
    pub radius: f64,
}

impl Fence {
    pub fn center(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Whether the sample lies inside this fence, widened by twice the
    /// sample accuracy.
    pub fn contains(&self, sample: &LocationData) -> bool {
        let distance = sample.distance_to_point(self.center());
        distance < self.radius + ACCURACY_INCLUSION_FACTOR * sample.accuracy
    }
}
