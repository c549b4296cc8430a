// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Alert fan-out to every account's notification channel.

use crate::db::AccountStore;
use crate::models::AccountId;
use async_trait::async_trait;
use std::sync::Arc;

/// Destination for human-readable alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Broadcast `text` to every registered channel except the one belonging
    /// to `exclude`. Best effort: never fails the caller.
    async fn alert(&self, text: &str, exclude: Option<AccountId>);
}

/// Delivery failure for a single recipient.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery request failed: {0}")]
    Request(String),

    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sends a message to one chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
}

/// Notifier used when no bot token is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        tracing::info!(chat_id, text, "Alert (delivery disabled)");
        Ok(())
    }
}

/// [`AlertSink`] that resolves recipients from the account store and
/// delivers sequentially through a [`Notifier`].
pub struct Broadcaster {
    accounts: Arc<dyn AccountStore>,
    notifier: Arc<dyn Notifier>,
}

impl Broadcaster {
    pub fn new(accounts: Arc<dyn AccountStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { accounts, notifier }
    }
}

#[async_trait]
impl AlertSink for Broadcaster {
    async fn alert(&self, text: &str, exclude: Option<AccountId>) {
        let accounts = match self.accounts.get_all_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!(error = %e, text, "Failed to load alert recipients");
                return;
            }
        };

        for account in accounts {
            if Some(account.id) == exclude {
                continue;
            }
            let Some(chat_id) = account.chat_id else {
                continue;
            };

            if let Err(e) = self.notifier.send(chat_id, text).await {
                tracing::warn!(
                    account_id = account.id,
                    chat_id,
                    error = %e,
                    "Failed to deliver alert"
                );
            }
        }
    }
}
