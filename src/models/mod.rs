// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;
pub mod fence;
pub mod update;

pub use account::{Account, AccountId, AccountStatus};
pub use fence::{Fence, FenceId};
pub use update::{BatteryData, LocationData, Update, UpdateData};
