// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use beacon_tracker::config::Config;
use beacon_tracker::db::{
    AccountStore, FenceRepository, FirestoreDb, MemoryStore, Storage, StoreError, UpdateHistory,
};
use beacon_tracker::models::{
    Account, AccountId, AccountStatus, Fence, FenceId, LocationData, Update, UpdateData,
};
use beacon_tracker::routes::create_router;
use beacon_tracker::services::{
    AccountLocks, AlertSink, IngestService, OfflineSweeper, RateLimiter, RequestContext,
};
use beacon_tracker::AppState;
use chrono::{DateTime, Utc};
use geo::{Destination, Haversine, Point};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Origin used by location tests (central Moscow).
#[allow(dead_code)]
pub const BASE_LAT: f64 = 55.7558;
#[allow(dead_code)]
pub const BASE_LON: f64 = 37.6173;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Sample `meters` from the test origin along `bearing` (degrees).
#[allow(dead_code)]
pub fn offset(bearing: f64, meters: f64, accuracy: f64) -> LocationData {
    let origin = Point::new(BASE_LON, BASE_LAT);
    let p = Haversine.destination(origin, bearing, meters);
    LocationData::new(p.y(), p.x(), accuracy)
}

/// Circular fence centered `meters` north of the test origin.
#[allow(dead_code)]
pub fn fence_north(id: FenceId, name: &str, meters: f64, radius: f64) -> Fence {
    let center = offset(0.0, meters, 0.0);
    Fence {
        id,
        name: name.to_string(),
        latitude: center.latitude,
        longitude: center.longitude,
        radius,
    }
}

#[allow(dead_code)]
pub fn account(id: AccountId, name: &str, chat_id: Option<i64>) -> Account {
    Account {
        id,
        name: name.to_string(),
        chat_id,
        status: AccountStatus::default(),
    }
}

#[allow(dead_code)]
pub fn location_update(location: LocationData) -> UpdateData {
    UpdateData {
        location: Some(location),
        battery: None,
    }
}

// ─── Alert recording ─────────────────────────────────────────

/// Alert sink that remembers every broadcast.
#[derive(Default)]
pub struct RecordingAlerts {
    sent: Mutex<Vec<(String, Option<AccountId>)>>,
    /// Stall applied once, to the next alert only
    next_delay: Mutex<Option<Duration>>,
}

#[allow(dead_code)]
impl RecordingAlerts {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<(String, Option<AccountId>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Make the next delivery slow, like a notifier stuck on the network.
    pub fn delay_next_alert(&self, delay: Duration) {
        *self.next_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn alert(&self, text: &str, exclude: Option<AccountId>) {
        let delay = self.next_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((text.to_string(), exclude));
    }
}

// ─── Failure injection ───────────────────────────────────────

/// Wraps a [`MemoryStore`] and fails selected operations on demand.
/// Flags are flipped directly with `store(true, Ordering::SeqCst)`.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: Arc<MemoryStore>,
    pub fail_fences: AtomicBool,
    pub fail_history_reads: AtomicBool,
    pub fail_status_writes: AtomicBool,
    pub fail_update_writes: AtomicBool,
    /// Accounts whose reads fail
    pub broken_accounts: Mutex<Vec<AccountId>>,
    /// Delay applied to every account read, to widen race windows
    pub read_delay: Mutex<Option<Duration>>,
}

fn injected(what: &str) -> StoreError {
    StoreError::Unavailable(format!("injected {} failure", what))
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn break_account(&self, id: AccountId) {
        self.broken_accounts.lock().unwrap().push(id);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    fn is_broken(&self, id: AccountId) -> bool {
        self.broken_accounts.lock().unwrap().contains(&id)
    }
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.is_broken(id) {
            return Err(injected("account read"));
        }
        self.inner.get_account(id).await
    }

    async fn get_all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.inner.get_all_accounts().await
    }

    async fn get_account_by_token(
        &self,
        token_digest: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.inner.get_account_by_token(token_digest).await
    }

    async fn update_account_status(
        &self,
        id: AccountId,
        status: &AccountStatus,
    ) -> Result<(), StoreError> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(injected("status write"));
        }
        self.inner.update_account_status(id, status).await
    }
}

#[async_trait]
impl FenceRepository for FaultyStore {
    async fn get_all_fences(&self) -> Result<Vec<Fence>, StoreError> {
        if self.fail_fences.load(Ordering::SeqCst) {
            return Err(injected("fence read"));
        }
        self.inner.get_all_fences().await
    }
}

#[async_trait]
impl UpdateHistory for FaultyStore {
    async fn create_update(
        &self,
        account_id: AccountId,
        created: DateTime<Utc>,
        data: &UpdateData,
    ) -> Result<Update, StoreError> {
        if self.fail_update_writes.load(Ordering::SeqCst) {
            return Err(injected("update write"));
        }
        self.inner.create_update(account_id, created, data).await
    }

    async fn get_last_update(&self, account_id: AccountId) -> Result<Option<Update>, StoreError> {
        if self.fail_history_reads.load(Ordering::SeqCst) {
            return Err(injected("history read"));
        }
        self.inner.get_last_update(account_id).await
    }

    async fn get_last_located_update(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Update>, StoreError> {
        if self.fail_history_reads.load(Ordering::SeqCst) {
            return Err(injected("history read"));
        }
        self.inner.get_last_located_update(account_id).await
    }

    async fn get_recent_updates(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<Update>, StoreError> {
        if self.fail_history_reads.load(Ordering::SeqCst) {
            return Err(injected("history read"));
        }
        self.inner.get_recent_updates(account_id, limit).await
    }
}

// ─── Service harness ─────────────────────────────────────────

/// Ingest service and sweeper wired to a fault-injectable in-memory store.
#[allow(dead_code)]
pub struct Harness {
    pub memory: Arc<MemoryStore>,
    pub store: Arc<FaultyStore>,
    pub alerts: Arc<RecordingAlerts>,
    pub locks: AccountLocks,
    pub ingest: IngestService,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(FaultyStore::new(memory.clone()));
        let alerts = Arc::new(RecordingAlerts::default());
        let locks = AccountLocks::new();
        let ingest = IngestService::new(
            Storage::from_backend(store.clone()),
            alerts.clone(),
            locks.clone(),
        );

        Self {
            memory,
            store,
            alerts,
            locks,
            ingest,
        }
    }

    pub fn add_account(&self, id: AccountId, name: &str) -> RequestContext {
        let account = account(id, name, Some(id * 100));
        self.memory
            .insert_account(account.clone(), &format!("token-{}", id));
        RequestContext {
            account,
            client_ip: "198.51.100.1".to_string(),
        }
    }

    pub async fn status(&self, id: AccountId) -> AccountStatus {
        self.memory
            .get_account(id)
            .await
            .unwrap()
            .expect("account exists")
            .status
    }

    pub fn sweeper(&self, threshold: Duration, interval: Duration) -> OfflineSweeper {
        OfflineSweeper::new(
            Storage::from_backend(self.store.clone()),
            self.alerts.clone(),
            self.locks.clone(),
            threshold,
            interval,
        )
    }
}

// ─── HTTP app ────────────────────────────────────────────────

/// Create a test app on the in-memory store.
/// Returns the router, the shared state and the backing store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let config = Config::test_default();
    let memory = Arc::new(MemoryStore::new());
    let storage = Storage::from_backend(memory.clone());
    let alerts = Arc::new(RecordingAlerts::default());

    let state = Arc::new(AppState {
        config,
        storage: storage.clone(),
        rate_limiter: RateLimiter::new(),
        ingest_service: IngestService::new(storage, alerts, AccountLocks::new()),
    });

    (create_router(state.clone()), state, memory)
}
