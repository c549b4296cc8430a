// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and presence status models.

use crate::models::{FenceId, LocationData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type AccountId = i64;

/// A tracked subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Display name used in alert texts
    pub name: String,
    /// Telegram chat receiving alerts (None = no notifications)
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub status: AccountStatus,
}

/// Presence status of an account.
///
/// Replaced wholesale on every write. A new account starts outside every
/// fence, moving and online.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountStatus {
    /// Fences containing the most recently ingested location
    #[serde(default)]
    pub inside_fences: BTreeSet<FenceId>,
    /// Anchor sample while the account is stationary
    #[serde(default)]
    pub still_location: Option<LocationData>,
    /// No update received within the offline threshold
    #[serde(default)]
    pub offline: bool,
}

impl AccountStatus {
    pub fn is_stationary(&self) -> bool {
        self.still_location.is_some()
    }
}
