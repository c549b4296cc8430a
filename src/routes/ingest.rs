// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location update ingestion.

use crate::error::Result;
use crate::models::{FenceId, UpdateData};
use crate::services::stillness::StillnessEvent;
use crate::services::RequestContext;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Ingest routes. Rate limiting and authentication are applied in
/// routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/v1/ingest", post(ingest_update))
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum StillnessChange {
    Stopped,
    Resumed,
}

impl From<StillnessEvent> for StillnessChange {
    fn from(event: StillnessEvent) -> Self {
        match event {
            StillnessEvent::BecameStationary => StillnessChange::Stopped,
            StillnessEvent::ResumedMoving => StillnessChange::Resumed,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IngestResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number[]"))]
    pub entered: Vec<FenceId>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number[]"))]
    pub left: Vec<FenceId>,
    pub stillness: Option<StillnessChange>,
    pub degraded: bool,
}

/// Accept one update from the authenticated device.
async fn ingest_update(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(data): Json<UpdateData>,
) -> Result<Json<IngestResponse>> {
    let report = state.ingest_service.ingest(&ctx, data).await?;

    Ok(Json(IngestResponse {
        entered: report.entered,
        left: report.left,
        stillness: report.stillness.map(StillnessChange::from),
        degraded: report.degraded,
    }))
}
