// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at it.
//!
//! The emulator provides a clean state for each test run.

use beacon_tracker::db::firestore::AccountDocument;
use beacon_tracker::db::{token_digest, AccountStore, FenceRepository, UpdateHistory};
use beacon_tracker::models::{AccountStatus, AccountId, Fence, UpdateData};
use chrono::{Duration, TimeZone, Utc};
use std::collections::BTreeSet;

mod common;
use common::{location_update, offset, test_db};

/// Generate a unique account ID for test isolation.
fn unique_account_id() -> AccountId {
    use std::time::{SystemTime, UNIX_EPOCH};
    (SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        % i64::MAX as u128) as AccountId
}

fn account_doc(id: AccountId, token: &str) -> AccountDocument {
    AccountDocument {
        id,
        name: format!("Tester {}", id),
        chat_id: Some(id),
        token_digest: token_digest(token),
    }
}

#[tokio::test]
async fn test_account_without_status_starts_default() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_account_id();
    db.upsert_account(&account_doc(id, &format!("token-{}", id)))
        .await
        .unwrap();

    let account = db.get_account(id).await.unwrap().expect("account exists");
    assert_eq!(account.status, AccountStatus::default());
    assert_eq!(account.chat_id, Some(id));
}

#[tokio::test]
async fn test_status_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_account_id();
    db.upsert_account(&account_doc(id, &format!("token-{}", id)))
        .await
        .unwrap();

    let status = AccountStatus {
        inside_fences: BTreeSet::from([3, 1]),
        still_location: Some(offset(0.0, 0.0, 12.5)),
        offline: true,
    };
    db.update_account_status(id, &status).await.unwrap();

    let loaded = db.get_account(id).await.unwrap().unwrap();
    assert_eq!(loaded.status, status);
}

#[tokio::test]
async fn test_status_update_for_unknown_account_fails() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_account_id();
    let status = AccountStatus {
        offline: true,
        ..Default::default()
    };

    assert!(db.update_account_status(id, &status).await.is_err());
    assert!(db.get_account(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_lookup_by_token_digest() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_account_id();
    let token = format!("token-{}", id);
    db.upsert_account(&account_doc(id, &token)).await.unwrap();

    let found = db.get_account_by_token(&token_digest(&token)).await.unwrap();
    assert_eq!(found.map(|a| a.id), Some(id));

    let missing = db
        .get_account_by_token(&token_digest("no-such-token"))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_fence_listing() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_account_id();
    let fence = Fence {
        id,
        name: "Emulator Park".to_string(),
        latitude: 37.3,
        longitude: -122.2,
        radius: 250.0,
    };
    db.upsert_fence(&fence).await.unwrap();

    let fences = db.get_all_fences().await.unwrap();
    assert!(fences.contains(&fence));
}

#[tokio::test]
async fn test_history_is_newest_first() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_account_id();
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();

    for minutes in [0, 10, 5] {
        db.create_update(
            id,
            start + Duration::minutes(minutes),
            &location_update(offset(0.0, minutes as f64, 5.0)),
        )
        .await
        .unwrap();
    }

    let last = db.get_last_update(id).await.unwrap().unwrap();
    assert_eq!(last.created, start + Duration::minutes(10));

    let recent = db.get_recent_updates(id, 2).await.unwrap();
    let created: Vec<_> = recent.iter().map(|u| u.created).collect();
    assert_eq!(
        created,
        vec![start + Duration::minutes(10), start + Duration::minutes(5)]
    );
}

#[tokio::test]
async fn test_no_history() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_account_id();
    assert!(db.get_last_update(id).await.unwrap().is_none());
    assert!(db.get_recent_updates(id, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_last_located_update_skips_battery_only_records() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_account_id();
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();

    db.create_update(id, start, &location_update(offset(0.0, 0.0, 5.0)))
        .await
        .unwrap();
    for minutes in 1..=12 {
        db.create_update(id, start + Duration::minutes(minutes), &UpdateData::default())
            .await
            .unwrap();
    }

    let found = db.get_last_located_update(id).await.unwrap().unwrap();
    assert_eq!(found.created, start);
    assert!(found.data.location.is_some());
    assert!(db.get_last_located_update(id + 1).await.unwrap().is_none());
}
