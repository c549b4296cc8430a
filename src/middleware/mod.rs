// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (client IP, rate limiting, authentication, security).

pub mod auth;
pub mod client_ip;
pub mod rate_limit;
pub mod security;

pub use auth::require_account;
pub use client_ip::client_ip;
pub use rate_limit::limit_ingest;
