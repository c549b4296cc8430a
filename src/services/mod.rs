// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod alert;
pub mod geofence;
pub mod ingest;
pub mod locks;
pub mod offline;
pub mod rate_limit;
pub mod stillness;
pub mod telegram;

pub use alert::{AlertSink, Broadcaster, LogNotifier, Notifier, NotifyError};
pub use ingest::{AccountSnapshot, IngestError, IngestReport, IngestService, RequestContext};
pub use locks::AccountLocks;
pub use offline::{OfflineSweeper, SweepReport};
pub use rate_limit::RateLimiter;
pub use telegram::TelegramNotifier;
