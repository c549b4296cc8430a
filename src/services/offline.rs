// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic detection of accounts that stopped sending updates.

use crate::db::{Storage, StoreError};
use crate::models::AccountId;
use crate::services::alert::AlertSink;
use crate::services::locks::AccountLocks;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Accounts checked at the same time within one sweep.
const SWEEP_CONCURRENCY: usize = 8;

/// Outcome of one sweep over all accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    /// Accounts newly marked offline, ascending
    pub marked: Vec<AccountId>,
    /// Accounts whose check failed and will be retried next sweep
    pub failed: usize,
}

enum Check {
    Online,
    MarkedOffline,
}

pub struct OfflineSweeper {
    storage: Storage,
    alerts: Arc<dyn AlertSink>,
    locks: AccountLocks,
    threshold: Duration,
    interval: Duration,
}

impl OfflineSweeper {
    pub fn new(
        storage: Storage,
        alerts: Arc<dyn AlertSink>,
        locks: AccountLocks,
        threshold: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            storage,
            alerts,
            locks,
            threshold,
            interval,
        }
    }

    /// Sweep every `interval` until `cancel` fires.
    ///
    /// The first sweep runs one interval after start. A sweep in progress is
    /// allowed to finish before the loop observes cancellation.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            threshold_secs = self.threshold.as_secs(),
            "Offline sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let report = self.sweep(Utc::now()).await;
            tracing::debug!(
                checked = report.checked,
                marked = report.marked.len(),
                failed = report.failed,
                "Offline sweep finished"
            );
        }

        tracing::info!("Offline sweeper stopped");
    }

    /// Check every account once against `now`.
    ///
    /// A failure on one account is logged and counted; the remaining
    /// accounts are still checked.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let accounts = match self.storage.accounts.get_all_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list accounts for offline sweep");
                return SweepReport {
                    failed: 1,
                    ..Default::default()
                };
            }
        };

        let results: Vec<(AccountId, Result<Check, StoreError>)> = stream::iter(accounts)
            .map(|account| async move { (account.id, self.check_account(account.id, now).await) })
            .buffer_unordered(SWEEP_CONCURRENCY)
            .collect()
            .await;

        let mut report = SweepReport {
            checked: results.len(),
            ..Default::default()
        };

        for (account_id, result) in results {
            match result {
                Ok(Check::MarkedOffline) => report.marked.push(account_id),
                Ok(Check::Online) => {}
                Err(e) => {
                    tracing::warn!(account_id, error = %e, "Offline check failed");
                    report.failed += 1;
                }
            }
        }

        report.marked.sort_unstable();
        report
    }

    async fn check_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<Check, StoreError> {
        let guard = self.locks.acquire(account_id).await;

        // An ingest may have landed since the account list was read.
        let Some(account) = self.storage.accounts.get_account(account_id).await? else {
            return Ok(Check::Online);
        };
        if account.status.offline {
            return Ok(Check::Online);
        }

        let Some(last) = self.storage.updates.get_last_update(account_id).await? else {
            return Ok(Check::Online);
        };

        let silent_for = now.signed_duration_since(last.created);
        if silent_for.to_std().map_or(true, |d| d < self.threshold) {
            return Ok(Check::Online);
        }

        let mut status = account.status.clone();
        status.offline = true;
        self.storage
            .accounts
            .update_account_status(account_id, &status)
            .await?;

        tracing::info!(
            account_id,
            last_seen = %format_utc_rfc3339(last.created),
            "Account went offline"
        );

        let text = format!(
            "🚨 {} stopped sending updates (last seen {})",
            account.name,
            format_utc_rfc3339(last.created)
        );
        // Sent under the lock so it cannot trail a later ingest's alerts
        self.alerts.alert(&text, Some(account_id)).await;
        drop(guard);

        Ok(Check::MarkedOffline)
    }
}
