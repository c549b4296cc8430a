// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.
//!
//! Data lives for the lifetime of the process only.

use crate::db::{token_digest, AccountStore, FenceRepository, StoreError, UpdateHistory};
use crate::models::{Account, AccountId, AccountStatus, Fence, FenceId, Update, UpdateData};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone)]
struct StoredAccount {
    account: Account,
    token_digest: String,
}

#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<AccountId, StoredAccount>,
    fences: DashMap<FenceId, Fence>,
    /// Per-account history, ordered by creation time
    updates: DashMap<AccountId, Vec<Update>>,
    next_update_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account reachable with the given device token.
    pub fn insert_account(&self, account: Account, token: &str) {
        self.accounts.insert(
            account.id,
            StoredAccount {
                account,
                token_digest: token_digest(token),
            },
        );
    }

    pub fn insert_fence(&self, fence: Fence) {
        self.fences.insert(fence.id, fence);
    }

    pub fn remove_fence(&self, id: FenceId) -> Option<Fence> {
        self.fences.remove(&id).map(|(_, fence)| fence)
    }

    /// Number of history records for an account.
    pub fn update_count(&self, account_id: AccountId) -> usize {
        self.updates
            .get(&account_id)
            .map(|history| history.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|stored| stored.account.clone()))
    }

    async fn get_all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|stored| stored.account.clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }

    async fn get_account_by_token(
        &self,
        token_digest: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .iter()
            .find(|stored| stored.token_digest == token_digest)
            .map(|stored| stored.account.clone()))
    }

    async fn update_account_status(
        &self,
        id: AccountId,
        status: &AccountStatus,
    ) -> Result<(), StoreError> {
        let mut stored = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Unavailable(format!("account {} does not exist", id)))?;
        stored.account.status = status.clone();
        Ok(())
    }
}

#[async_trait]
impl FenceRepository for MemoryStore {
    async fn get_all_fences(&self) -> Result<Vec<Fence>, StoreError> {
        let mut fences: Vec<Fence> = self.fences.iter().map(|f| f.value().clone()).collect();
        fences.sort_by_key(|fence| fence.id);
        Ok(fences)
    }
}

#[async_trait]
impl UpdateHistory for MemoryStore {
    async fn create_update(
        &self,
        account_id: AccountId,
        created: DateTime<Utc>,
        data: &UpdateData,
    ) -> Result<Update, StoreError> {
        let id = self.next_update_id.fetch_add(1, Ordering::Relaxed) + 1;
        let update = Update {
            id: id.to_string(),
            account_id,
            created,
            data: data.clone(),
        };

        let mut history = self.updates.entry(account_id).or_default();
        let position = history.partition_point(|existing| existing.created <= created);
        history.insert(position, update.clone());

        Ok(update)
    }

    async fn get_last_update(&self, account_id: AccountId) -> Result<Option<Update>, StoreError> {
        Ok(self
            .updates
            .get(&account_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn get_last_located_update(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Update>, StoreError> {
        Ok(self.updates.get(&account_id).and_then(|history| {
            history
                .iter()
                .rev()
                .find(|update| update.data.location.is_some())
                .cloned()
        }))
    }

    async fn get_recent_updates(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<Update>, StoreError> {
        Ok(self
            .updates
            .get(&account_id)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
