// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Periodic cleanup bounding ledger growth.
//!
//! Runs on a fixed interval, decoupled from the request path. Failures are
//! logged and retried on the next tick, never propagated to request
//! handling. Rate-limit keys self-expire via TTL and are only swept by the
//! explicit full reset used in test teardown.

use crate::ledger::LedgerStore;
use crate::store::CounterStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Background sweep over the blacklist and failed-attempt ledgers.
pub struct CleanupTask {
    ledger: Arc<dyn LedgerStore>,
    counters: Arc<dyn CounterStore>,
    attempt_retention_hours: i64,
    rate_prefixes: Vec<String>,
}

impl CleanupTask {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        counters: Arc<dyn CounterStore>,
        attempt_retention_hours: i64,
        rate_prefixes: Vec<String>,
    ) -> Self {
        Self {
            ledger,
            counters,
            attempt_retention_hours,
            rate_prefixes,
        }
    }

    /// One sweep: drop expired blacklist entries and failed attempts past
    /// retention. Idempotent; a second run with no new data deletes nothing.
    pub async fn run(&self) {
        self.run_at(Utc::now()).await;
    }

    /// [`run`](Self::run) against an explicit clock.
    pub async fn run_at(&self, now: DateTime<Utc>) {
        match self.ledger.purge_expired_blacklist(now).await {
            Ok(purged) if purged > 0 => debug!(purged, "Purged expired blacklist entries"),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Blacklist cleanup failed; will retry next tick"),
        }

        let cutoff = now - ChronoDuration::hours(self.attempt_retention_hours);
        match self.ledger.purge_attempts_before(cutoff).await {
            Ok(purged) if purged > 0 => debug!(purged, "Purged stale failed attempts"),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Attempt cleanup failed; will retry next tick"),
        }
    }

    /// Delete every rate-limit key under the known policy prefixes.
    /// Full reset for test teardown; not part of the periodic sweep.
    pub async fn reset_rate_keys(&self) -> u64 {
        let mut removed = 0;
        for prefix in &self.rate_prefixes {
            match self.counters.delete_prefix(prefix).await {
                Ok(n) => removed += n,
                Err(err) => warn!(prefix, error = %err, "Rate key reset failed"),
            }
        }
        removed
    }

    /// Run the sweep on `interval` until the task is aborted.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so startup isn't a sweep
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.run().await;
            }
        })
    }
}
