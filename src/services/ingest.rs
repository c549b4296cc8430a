// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location update processing.
//!
//! Handles the core workflow for one inbound update:
//! 1. Validate the payload
//! 2. Take the account's exclusive section and load its current status
//! 3. Diff fence membership and advance the stillness hysteresis
//!    (best effort: failures here are logged and the update is still recorded)
//! 4. Mark the account online and persist the status
//! 5. Append the raw update to the history
//! 6. Broadcast alerts once everything is committed, still inside the
//!    exclusive section so one account's alerts go out in commit order

use crate::db::{Storage, StoreError};
use crate::models::{
    Account, AccountId, AccountStatus, FenceId, LocationData, Update, UpdateData,
};
use crate::services::alert::AlertSink;
use crate::services::geofence::{self, FenceDiff};
use crate::services::locks::AccountLocks;
use crate::services::stillness::{self, Motion, StillnessEvent, Transition};
use chrono::Utc;
use std::sync::Arc;

/// Per-request context resolved by the transport layer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated account (status as of authentication, may be stale)
    pub account: Account,
    pub client_ip: String,
}

/// Errors returned to the caller of [`IngestService::ingest`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid update: {0}")]
    Validation(String),

    #[error("account {0} no longer exists")]
    UnknownAccount(AccountId),

    #[error("failed to load account: {0}")]
    LoadAccount(#[source] StoreError),

    #[error("failed to persist account status: {0}")]
    PersistStatus(#[source] StoreError),

    #[error("failed to record update: {0}")]
    RecordUpdate(#[source] StoreError),
}

/// What a successful ingest changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub entered: Vec<FenceId>,
    pub left: Vec<FenceId>,
    pub stillness: Option<StillnessEvent>,
    /// Location processing was skipped or partial because a store read failed
    pub degraded: bool,
    /// Alert texts broadcast for this update, in delivery order
    pub alerts: Vec<String>,
}

/// Account state as of the last committed ingest.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub account: Account,
    pub last_update: Option<Update>,
}

struct LocationOutcome {
    diff: FenceDiff,
    transition: Transition,
    history_unavailable: bool,
}

/// Ingest orchestrator, shared by all request handlers.
#[derive(Clone)]
pub struct IngestService {
    storage: Storage,
    alerts: Arc<dyn AlertSink>,
    locks: AccountLocks,
}

impl IngestService {
    pub fn new(storage: Storage, alerts: Arc<dyn AlertSink>, locks: AccountLocks) -> Self {
        Self {
            storage,
            alerts,
            locks,
        }
    }

    /// Process one update from the authenticated account in `ctx`.
    pub async fn ingest(
        &self,
        ctx: &RequestContext,
        data: UpdateData,
    ) -> Result<IngestReport, IngestError> {
        if let Err(e) = data.ensure_valid() {
            tracing::debug!(
                account_id = ctx.account.id,
                client_ip = %ctx.client_ip,
                error = %e,
                "Rejected invalid update"
            );
            return Err(IngestError::Validation(e));
        }

        let account_id = ctx.account.id;
        let guard = self.locks.acquire(account_id).await;

        // Re-read under the lock: the status attached to the request context
        // may predate a concurrent writer.
        let account = self
            .storage
            .accounts
            .get_account(account_id)
            .await
            .map_err(IngestError::LoadAccount)?
            .ok_or(IngestError::UnknownAccount(account_id))?;

        let previous_status = account.status.clone();
        let mut status = account.status.clone();
        let mut report = IngestReport::default();

        if let Some(location) = &data.location {
            match self.process_location(&account, location).await {
                Ok(outcome) => {
                    report.degraded = outcome.history_unavailable;
                    report.entered = outcome.diff.entered.iter().map(|f| f.id).collect();
                    report.left = outcome.diff.left.iter().map(|f| f.id).collect();
                    report.stillness = outcome.transition.event;
                    report.alerts = outcome.diff.alert_texts(&account.name);
                    if let Some(event) = outcome.transition.event {
                        report.alerts.push(event.alert_text(&account.name, location));
                    }

                    status.inside_fences = outcome.diff.inside;
                    status.still_location = outcome.transition.motion.into_anchor();
                }
                Err(e) => {
                    tracing::warn!(
                        account_id,
                        error = %e,
                        "Failed to process location, recording update without it"
                    );
                    report.degraded = true;
                }
            }
        }

        status.offline = false;

        self.storage
            .accounts
            .update_account_status(account_id, &status)
            .await
            .map_err(IngestError::PersistStatus)?;

        if let Err(e) = self
            .storage
            .updates
            .create_update(account_id, Utc::now(), &data)
            .await
        {
            // Best effort: readers that skip the lock may briefly see the
            // status written above before it is put back.
            self.restore_status(account_id, &status, &previous_status)
                .await;
            return Err(IngestError::RecordUpdate(e));
        }

        for text in &report.alerts {
            self.alerts.alert(text, Some(account_id)).await;
        }

        drop(guard);

        tracing::debug!(
            account_id,
            client_ip = %ctx.client_ip,
            has_location = data.location.is_some(),
            has_battery = data.battery.is_some(),
            degraded = report.degraded,
            "Update ingested"
        );

        Ok(report)
    }

    /// Read an account and its last update inside its exclusive section, so
    /// a status that is about to be rolled back is never returned.
    pub async fn snapshot(
        &self,
        account_id: AccountId,
    ) -> Result<Option<AccountSnapshot>, StoreError> {
        let _guard = self.locks.acquire(account_id).await;

        let Some(account) = self.storage.accounts.get_account(account_id).await? else {
            return Ok(None);
        };
        let last_update = self.storage.updates.get_last_update(account_id).await?;

        Ok(Some(AccountSnapshot {
            account,
            last_update,
        }))
    }

    async fn process_location(
        &self,
        account: &Account,
        location: &LocationData,
    ) -> Result<LocationOutcome, StoreError> {
        let fences = self.storage.fences.get_all_fences().await?;
        let diff = geofence::diff(location, &account.status.inside_fences, &fences);

        if !diff.is_unchanged() {
            tracing::info!(
                account_id = account.id,
                entered = ?diff.entered.iter().map(|f| f.id).collect::<Vec<_>>(),
                left = ?diff.left.iter().map(|f| f.id).collect::<Vec<_>>(),
                "Fence membership changed"
            );
        }

        let near_fence = !diff.inside.is_empty() || !diff.left.is_empty();
        let motion = Motion::from_anchor(account.status.still_location.clone());

        let mut history_unavailable = false;
        let previous = if stillness::needs_previous_sample(&motion, near_fence) {
            match self.previous_sample(account.id).await {
                Ok(sample) => sample,
                Err(e) => {
                    tracing::warn!(
                        account_id = account.id,
                        error = %e,
                        "Failed to load previous sample, skipping stillness detection"
                    );
                    history_unavailable = true;
                    None
                }
            }
        } else {
            None
        };

        let transition = stillness::detect(motion, location, near_fence, previous.as_ref());
        if let Some(event) = transition.event {
            tracing::info!(account_id = account.id, ?event, "Stillness changed");
        }

        Ok(LocationOutcome {
            diff,
            transition,
            history_unavailable,
        })
    }

    /// Most recent earlier update that carried a location.
    async fn previous_sample(
        &self,
        account_id: AccountId,
    ) -> Result<Option<LocationData>, StoreError> {
        let last = self
            .storage
            .updates
            .get_last_located_update(account_id)
            .await?;

        Ok(last.and_then(|update| update.data.location))
    }

    /// Undo a committed status write after the history append failed.
    async fn restore_status(
        &self,
        account_id: AccountId,
        written: &AccountStatus,
        previous: &AccountStatus,
    ) {
        if written == previous {
            return;
        }

        if let Err(e) = self
            .storage
            .accounts
            .update_account_status(account_id, previous)
            .await
        {
            tracing::error!(
                account_id,
                error = %e,
                "Failed to restore account status after history write failure"
            );
        }
    }
}
