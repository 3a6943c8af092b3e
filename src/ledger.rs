// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Blacklist and failed-attempt ledgers.
//!
//! Two independent, append-mostly ledgers consulted by the abuse heuristics:
//! a blacklist of network identifiers with optional expiry, and a log of
//! failed authentication attempts with age-based retention. They are not
//! relationally linked; both are plain lookups keyed by IP or email.
//!
//! Production deployments implement [`LedgerStore`] over whatever database
//! already holds their data; [`MemoryLedgerStore`] is the bundled
//! single-process implementation, also used by the test suite.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A network identifier barred from making requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub ip: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    /// `None` means indefinite.
    pub expires_at: Option<DateTime<Utc>>,
}

impl BlacklistEntry {
    /// Whether this entry bars requests at `now`.
    pub fn active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }
}

/// One failed authentication attempt. Append-only; never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub ip: String,
    pub email: String,
    pub user_agent: String,
    pub at: DateTime<Utc>,
}

/// Storage for the blacklist and failed-attempt ledgers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a blacklist entry.
    async fn insert_blacklist(&self, entry: BlacklistEntry) -> Result<(), StoreError>;

    /// All blacklist entries for `ip`, active or not.
    async fn blacklist_entries(&self, ip: &str) -> Result<Vec<BlacklistEntry>, StoreError>;

    /// Delete blacklist entries whose expiry is in the past. Indefinite
    /// entries are never removed here. Returns the number deleted.
    async fn purge_expired_blacklist(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Record a failed authentication attempt.
    async fn insert_attempt(&self, attempt: FailedAttempt) -> Result<(), StoreError>;

    /// The `limit` most recent attempts matching `ip` OR `email`,
    /// newest first.
    async fn recent_attempts(
        &self,
        ip: &str,
        email: &str,
        limit: usize,
    ) -> Result<Vec<FailedAttempt>, StoreError>;

    /// Delete all attempts recorded for `email`. Called on successful login.
    /// Returns the number deleted.
    async fn clear_attempts(&self, email: &str) -> Result<u64, StoreError>;

    /// Delete attempts older than `before`. Returns the number deleted.
    async fn purge_attempts_before(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// In-process ledger store backed by `RwLock`ed vectors.
#[derive(Default)]
pub struct MemoryLedgerStore {
    blacklist: RwLock<Vec<BlacklistEntry>>,
    attempts: RwLock<Vec<FailedAttempt>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_blacklist(&self, entry: BlacklistEntry) -> Result<(), StoreError> {
        self.blacklist.write().await.push(entry);
        Ok(())
    }

    async fn blacklist_entries(&self, ip: &str) -> Result<Vec<BlacklistEntry>, StoreError> {
        Ok(self
            .blacklist
            .read()
            .await
            .iter()
            .filter(|e| e.ip == ip)
            .cloned()
            .collect())
    }

    async fn purge_expired_blacklist(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut blacklist = self.blacklist.write().await;
        let before = blacklist.len();
        blacklist.retain(|e| match e.expires_at {
            None => true,
            Some(expires_at) => expires_at >= now,
        });
        Ok((before - blacklist.len()) as u64)
    }

    async fn insert_attempt(&self, attempt: FailedAttempt) -> Result<(), StoreError> {
        self.attempts.write().await.push(attempt);
        Ok(())
    }

    async fn recent_attempts(
        &self,
        ip: &str,
        email: &str,
        limit: usize,
    ) -> Result<Vec<FailedAttempt>, StoreError> {
        let attempts = self.attempts.read().await;
        let mut matching: Vec<FailedAttempt> = attempts
            .iter()
            .filter(|a| a.ip == ip || a.email == email)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.at.cmp(&a.at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn clear_attempts(&self, email: &str) -> Result<u64, StoreError> {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|a| a.email != email);
        Ok((before - attempts.len()) as u64)
    }

    async fn purge_attempts_before(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut attempts = self.attempts.write().await;
        let count = attempts.len();
        attempts.retain(|a| a.at >= before);
        Ok((count - attempts.len()) as u64)
    }
}
