// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stationary/moving hysteresis.
//!
//! The state is persisted as the optional anchor sample on the account
//! status: no anchor means moving, an anchor means stationary since that
//! sample. Accuracy is applied in opposite directions on the two edges so
//! that a single noisy fix can neither start nor end a stationary period.

use crate::models::LocationData;

/// Distance threshold (meters) separating "still" from "moving".
pub const STANDBY_RADIUS_METERS: f64 = 200.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Moving,
    /// Still since the anchor sample
    Stationary(LocationData),
}

impl Motion {
    pub fn from_anchor(anchor: Option<LocationData>) -> Self {
        match anchor {
            Some(anchor) => Motion::Stationary(anchor),
            None => Motion::Moving,
        }
    }

    pub fn into_anchor(self) -> Option<LocationData> {
        match self {
            Motion::Moving => None,
            Motion::Stationary(anchor) => Some(anchor),
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, Motion::Moving)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StillnessEvent {
    BecameStationary,
    ResumedMoving,
}

impl StillnessEvent {
    pub fn alert_text(&self, subject: &str, sample: &LocationData) -> String {
        match self {
            StillnessEvent::BecameStationary => match &sample.address {
                Some(address) => format!("💤 {} stopped moving near {}", subject, address),
                None => format!("💤 {} stopped moving", subject),
            },
            StillnessEvent::ResumedMoving => format!("🚶 {} started moving again", subject),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub motion: Motion,
    pub event: Option<StillnessEvent>,
}

impl Transition {
    fn quiet(motion: Motion) -> Self {
        Self {
            motion,
            event: None,
        }
    }
}

/// Whether [`detect`] will look at the previous sample for this input.
///
/// Lets the caller skip the history lookup when it cannot matter.
pub fn needs_previous_sample(current: &Motion, near_fence: bool) -> bool {
    current.is_moving() && !near_fence
}

/// Advance the hysteresis with a new sample.
///
/// `near_fence` is true when the account is inside any fence after the diff,
/// or has just left one in this update. Stillness tracking is suspended there.
///
/// `previous` is the most recent earlier sample; only consulted while moving.
/// Without one no transition is possible.
pub fn detect(
    current: Motion,
    sample: &LocationData,
    near_fence: bool,
    previous: Option<&LocationData>,
) -> Transition {
    if near_fence {
        return Transition::quiet(Motion::Moving);
    }

    match current {
        Motion::Stationary(anchor) => {
            let distance = anchor.distance_to(sample) - sample.accuracy;
            if distance <= STANDBY_RADIUS_METERS {
                Transition::quiet(Motion::Stationary(anchor))
            } else {
                Transition {
                    motion: Motion::Moving,
                    event: Some(StillnessEvent::ResumedMoving),
                }
            }
        }
        Motion::Moving => {
            let Some(previous) = previous else {
                return Transition::quiet(Motion::Moving);
            };

            let distance = previous.distance_to(sample) + sample.accuracy;
            if distance <= STANDBY_RADIUS_METERS {
                Transition {
                    motion: Motion::Stationary(sample.clone()),
                    event: Some(StillnessEvent::BecameStationary),
                }
            } else {
                Transition::quiet(Motion::Moving)
            }
        }
    }
}
