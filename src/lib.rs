// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beacon-Tracker: shared location tracking for a small group
//!
//! This crate provides the backend that ingests device location updates,
//! tracks fence membership and stillness per account, flags silent devices
//! as offline, and broadcasts alerts to the rest of the group.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Storage;
use services::{IngestService, RateLimiter};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
    pub rate_limiter: RateLimiter,
    pub ingest_service: IngestService,
}
