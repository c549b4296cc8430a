// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! The ingest engine only sees the three store traits below. Production
//! runs on Firestore; the in-memory store backs local development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::models::{Account, AccountId, AccountStatus, Fence, Update, UpdateData};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const ACCOUNTS: &str = "accounts";
    /// Account status documents (keyed by account id)
    pub const ACCOUNT_STATUS: &str = "account_status";
    pub const FENCES: &str = "fences";
    pub const UPDATES: &str = "updates";
}

/// Errors surfaced by a store backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt document: {0}")]
    Corrupt(String),
}

/// Account identity and status persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn get_all_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Resolve an account by the hex SHA-256 digest of its device token.
    async fn get_account_by_token(&self, token_digest: &str)
        -> Result<Option<Account>, StoreError>;

    async fn update_account_status(
        &self,
        id: AccountId,
        status: &AccountStatus,
    ) -> Result<(), StoreError>;
}

/// Read access to the configured fences.
#[async_trait]
pub trait FenceRepository: Send + Sync {
    async fn get_all_fences(&self) -> Result<Vec<Fence>, StoreError>;
}

/// Append-only update history.
#[async_trait]
pub trait UpdateHistory: Send + Sync {
    async fn create_update(
        &self,
        account_id: AccountId,
        created: DateTime<Utc>,
        data: &UpdateData,
    ) -> Result<Update, StoreError>;

    async fn get_last_update(&self, account_id: AccountId) -> Result<Option<Update>, StoreError>;

    /// Most recent update that carried a location, however far back it is.
    async fn get_last_located_update(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Update>, StoreError>;

    /// Most recent updates first.
    async fn get_recent_updates(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<Update>, StoreError>;
}

/// Handles to the three stores, shared by the ingest path and the sweeper.
#[derive(Clone)]
pub struct Storage {
    pub accounts: Arc<dyn AccountStore>,
    pub fences: Arc<dyn FenceRepository>,
    pub updates: Arc<dyn UpdateHistory>,
}

impl Storage {
    /// Use a single backend for all three stores.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AccountStore + FenceRepository + UpdateHistory + 'static,
    {
        Self {
            accounts: backend.clone(),
            fences: backend.clone(),
            updates: backend,
        }
    }
}

/// Hex SHA-256 digest of a device token, as stored alongside the account.
pub fn token_digest(token: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(token.as_bytes()))
}
