// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated devices.

use crate::error::{AppError, Result};
use crate::models::FenceId;
use crate::services::RequestContext;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require a device token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/v1/status", get(get_status))
}

/// Caller's own status.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusResponse {
    pub name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number[]"))]
    pub inside_fences: Vec<FenceId>,
    pub stationary: bool,
    pub offline: bool,
    pub last_seen: Option<String>,
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<StatusResponse>> {
    let snapshot = state
        .ingest_service
        .snapshot(ctx.account.id)
        .await?
        .ok_or(AppError::Forbidden)?;
    let account = snapshot.account;
    let status = account.status;

    Ok(Json(StatusResponse {
        name: account.name,
        stationary: status.is_stationary(),
        offline: status.offline,
        inside_fences: status.inside_fences.into_iter().collect(),
        last_seen: snapshot
            .last_update
            .map(|update| format_utc_rfc3339(update.created)),
    }))
}
