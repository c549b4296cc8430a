// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-IP ingest throttling.

use crate::config::INGEST_ACTION;
use crate::error::AppError;
use crate::middleware::client_ip;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Reject ingest requests over the per-IP budget before any other work,
/// including authentication.
pub async fn limit_ingest(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request, state.config.trust_forwarded_for);

    if !state
        .rate_limiter
        .allow(&ip, INGEST_ACTION, state.config.ingest_rate_limit)
    {
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}
