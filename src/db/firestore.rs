// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the store traits.
//!
//! Layout:
//! - `accounts/{id}` (identity, chat, token digest)
//! - `account_status/{id}` (presence status, written on every ingest)
//! - `fences/{id}`
//! - `updates/{account_id}_{created_micros}` (append-only history)
//!
//! The history queries need a composite index on
//! `updates(account_id ASC, created DESC)`.

use crate::db::{collections, AccountStore, FenceRepository, StoreError, UpdateHistory};
use crate::models::{
    Account, AccountId, AccountStatus, Fence, FenceId, LocationData, Update, UpdateData,
};
use crate::time_utils::{format_sortable_utc, parse_utc};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Account identity as stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDocument {
    pub id: AccountId,
    pub name: String,
    #[serde(default)]
    pub chat_id: Option<i64>,
    /// Hex SHA-256 digest of the device token
    pub token_digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusDocument {
    account_id: AccountId,
    #[serde(default)]
    inside_fences: Vec<FenceId>,
    #[serde(default)]
    still_location: Option<LocationData>,
    #[serde(default)]
    offline: bool,
}

impl StatusDocument {
    fn new(account_id: AccountId, status: &AccountStatus) -> Self {
        Self {
            account_id,
            inside_fences: status.inside_fences.iter().copied().collect(),
            still_location: status.still_location.clone(),
            offline: status.offline,
        }
    }

    fn into_status(self) -> AccountStatus {
        AccountStatus {
            inside_fences: self.inside_fences.into_iter().collect(),
            still_location: self.still_location,
            offline: self.offline,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UpdateDocument {
    id: String,
    account_id: AccountId,
    /// Fixed-width RFC3339 so lexicographic order matches time order
    created: String,
    /// Denormalized from `data.location` so located updates can be queried
    #[serde(default)]
    has_location: bool,
    data: UpdateData,
}

impl UpdateDocument {
    fn into_update(self) -> Result<Update, StoreError> {
        let created = parse_utc(&self.created).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "update {} has invalid timestamp {:?}",
                self.id, self.created
            ))
        })?;

        Ok(Update {
            id: self.id,
            account_id: self.account_id,
            created,
            data: self.data,
        })
    }
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| db_err(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| db_err(format!("Failed to connect to Firestore Emulator: {}", e)))?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client. Every operation fails with
    /// `StoreError::Unavailable`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| db_err("Database not connected (offline mode)"))
    }

    // ─── Administrative Writes ───────────────────────────────────

    /// Create or update an account identity document.
    pub async fn upsert_account(&self, account: &AccountDocument) -> Result<(), StoreError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACCOUNTS)
            .document_id(account.id.to_string())
            .object(account)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Create or update a fence.
    pub async fn upsert_fence(&self, fence: &Fence) -> Result<(), StoreError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FENCES)
            .document_id(fence.id.to_string())
            .object(fence)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ─── Helpers ─────────────────────────────────────────────────

    async fn get_status(&self, id: AccountId) -> Result<AccountStatus, StoreError> {
        let doc: Option<StatusDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNT_STATUS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(db_err)?;

        Ok(doc.map(StatusDocument::into_status).unwrap_or_default())
    }

    async fn with_status(&self, doc: AccountDocument) -> Result<Account, StoreError> {
        let status = self.get_status(doc.id).await?;
        Ok(Account {
            id: doc.id,
            name: doc.name,
            chat_id: doc.chat_id,
            status,
        })
    }
}

#[async_trait]
impl AccountStore for FirestoreDb {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let doc: Option<AccountDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNTS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(db_err)?;

        match doc {
            Some(doc) => Ok(Some(self.with_status(doc).await?)),
            None => Ok(None),
        }
    }

    async fn get_all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let client = self.get_client()?;

        let docs: Vec<AccountDocument> = client
            .fluent()
            .select()
            .from(collections::ACCOUNTS)
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        let statuses: Vec<StatusDocument> = client
            .fluent()
            .select()
            .from(collections::ACCOUNT_STATUS)
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        let mut statuses: HashMap<AccountId, AccountStatus> = statuses
            .into_iter()
            .map(|doc| (doc.account_id, doc.into_status()))
            .collect();

        let mut accounts: Vec<Account> = docs
            .into_iter()
            .map(|doc| Account {
                status: statuses.remove(&doc.id).unwrap_or_default(),
                id: doc.id,
                name: doc.name,
                chat_id: doc.chat_id,
            })
            .collect();
        accounts.sort_by_key(|account| account.id);

        Ok(accounts)
    }

    async fn get_account_by_token(
        &self,
        token_digest: &str,
    ) -> Result<Option<Account>, StoreError> {
        let token_digest = token_digest.to_string();
        let docs: Vec<AccountDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACCOUNTS)
            .filter(move |q| q.field("token_digest").eq(token_digest.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        match docs.into_iter().next() {
            Some(doc) => Ok(Some(self.with_status(doc).await?)),
            None => Ok(None),
        }
    }

    async fn update_account_status(
        &self,
        id: AccountId,
        status: &AccountStatus,
    ) -> Result<(), StoreError> {
        let client = self.get_client()?;

        // Status documents only exist alongside an account
        let account: Option<AccountDocument> = client
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNTS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(db_err)?;
        if account.is_none() {
            return Err(StoreError::Unavailable(format!(
                "account {} does not exist",
                id
            )));
        }

        let doc = StatusDocument::new(id, status);
        let _: () = client
            .fluent()
            .update()
            .in_col(collections::ACCOUNT_STATUS)
            .document_id(id.to_string())
            .object(&doc)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl FenceRepository for FirestoreDb {
    async fn get_all_fences(&self) -> Result<Vec<Fence>, StoreError> {
        let mut fences: Vec<Fence> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::FENCES)
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        fences.sort_by_key(|fence| fence.id);
        Ok(fences)
    }
}

#[async_trait]
impl UpdateHistory for FirestoreDb {
    async fn create_update(
        &self,
        account_id: AccountId,
        created: DateTime<Utc>,
        data: &UpdateData,
    ) -> Result<Update, StoreError> {
        let created_str = format_sortable_utc(created);
        let doc = UpdateDocument {
            id: format!(
                "{}_{}",
                account_id,
                created.timestamp_nanos_opt().unwrap_or_default()
            ),
            account_id,
            created: created_str,
            has_location: data.location.is_some(),
            data: data.clone(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::UPDATES)
            .document_id(&doc.id)
            .object(&doc)
            .execute()
            .await
            .map_err(db_err)?;

        doc.into_update()
    }

    async fn get_last_update(&self, account_id: AccountId) -> Result<Option<Update>, StoreError> {
        Ok(self
            .get_recent_updates(account_id, 1)
            .await?
            .into_iter()
            .next())
    }

    async fn get_last_located_update(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Update>, StoreError> {
        let docs: Vec<UpdateDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::UPDATES)
            .filter(move |q| {
                q.for_all([
                    q.field("account_id").eq(account_id),
                    q.field("has_location").eq(true),
                ])
            })
            .order_by([("created", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        docs.into_iter().next().map(UpdateDocument::into_update).transpose()
    }

    async fn get_recent_updates(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<Update>, StoreError> {
        let docs: Vec<UpdateDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::UPDATES)
            .filter(move |q| q.field("account_id").eq(account_id))
            .order_by([("created", firestore::FirestoreQueryDirection::Descending)])
            .limit(u32::try_from(limit).unwrap_or(u32::MAX))
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        docs.into_iter().map(UpdateDocument::into_update).collect()
    }
}
