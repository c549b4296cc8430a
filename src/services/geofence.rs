// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence membership diffing.

use crate::models::{Fence, FenceId, LocationData};
use std::collections::BTreeSet;

/// Result of comparing a new sample against the previous fence membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FenceDiff {
    /// Every fence containing the new sample
    pub inside: BTreeSet<FenceId>,
    /// Fences newly containing the sample, ascending by id
    pub entered: Vec<Fence>,
    /// Previously occupied fences no longer containing the sample, ascending by id
    pub left: Vec<Fence>,
}

impl FenceDiff {
    pub fn is_unchanged(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }

    /// Alert texts for this transition: departures first, then arrivals.
    pub fn alert_texts(&self, subject: &str) -> Vec<String> {
        let left = self
            .left
            .iter()
            .map(|fence| format!("🔴 {} left {}", subject, fence.name));
        let entered = self
            .entered
            .iter()
            .map(|fence| format!("🟢 {} entered {}", subject, fence.name));

        left.chain(entered).collect()
    }
}

/// Compute the new membership for `sample`.
///
/// Ids in `previous` that no longer name an existing fence drop out of the
/// membership without producing a "left" entry.
pub fn diff(sample: &LocationData, previous: &BTreeSet<FenceId>, fences: &[Fence]) -> FenceDiff {
    let mut result = FenceDiff::default();

    for fence in fences {
        let was_inside = previous.contains(&fence.id);

        if fence.contains(sample) {
            result.inside.insert(fence.id);
            if !was_inside {
                result.entered.push(fence.clone());
            }
        } else if was_inside {
            result.left.push(fence.clone());
        }
    }

    result.entered.sort_by_key(|fence| fence.id);
    result.left.sort_by_key(|fence| fence.id);
    result
}
