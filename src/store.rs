// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window counter store.
//!
//! Durable, shared storage for per-key ordered timestamp lists with TTL
//! expiry. The limiter only ever talks to the [`CounterStore`] trait, so the
//! backend is swappable: [`RedisCounterStore`] for deployments sharing state
//! across processes, [`MemoryCounterStore`] for single-process use and tests.
//!
//! Every operation may fail with [`StoreError`]; callers are expected to
//! fail open on read failures so a broken store never becomes an outage.

use crate::error::StoreError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Storage for per-key ordered timestamp lists.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Append a timestamp (epoch milliseconds) to the list for `key` and
    /// refresh the key's TTL.
    async fn append(&self, key: &str, timestamp_ms: i64, ttl: Duration) -> Result<(), StoreError>;

    /// All stored timestamps for `key`, oldest first. Empty if the key does
    /// not exist or has expired.
    async fn list(&self, key: &str) -> Result<Vec<i64>, StoreError>;

    /// Remove entries with index below `keep_from`, keeping only the suffix.
    async fn trim_front(&self, key: &str, keep_from: usize) -> Result<(), StoreError>;

    /// Bulk-delete all keys starting with `prefix`. Returns the number of
    /// keys removed. Used only for full resets (test teardown); live keys
    /// self-expire via TTL.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StoreError>;
}

/// In-process counter store backed by a `RwLock`ed map.
#[derive(Default)]
pub struct MemoryCounterStore {
    keys: RwLock<HashMap<String, WindowEntry>>,
}

struct WindowEntry {
    timestamps: Vec<i64>,
    expires_at: Instant,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn append(&self, key: &str, timestamp_ms: i64, ttl: Duration) -> Result<(), StoreError> {
        let mut keys = self.keys.write().await;
        let now = Instant::now();
        let entry = keys.entry(key.to_string()).or_insert_with(|| WindowEntry {
            timestamps: Vec::new(),
            expires_at: now + ttl,
        });
        if entry.expires_at <= now {
            entry.timestamps.clear();
        }
        entry.timestamps.push(timestamp_ms);
        entry.expires_at = now + ttl;
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<i64>, StoreError> {
        let keys = self.keys.read().await;
        Ok(match keys.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => entry.timestamps.clone(),
            _ => Vec::new(),
        })
    }

    async fn trim_front(&self, key: &str, keep_from: usize) -> Result<(), StoreError> {
        let mut keys = self.keys.write().await;
        if let Some(entry) = keys.get_mut(key) {
            let cut = keep_from.min(entry.timestamps.len());
            entry.timestamps.drain(..cut);
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        let mut keys = self.keys.write().await;
        let before = keys.len();
        keys.retain(|k, _| !k.starts_with(prefix));
        Ok((before - keys.len()) as u64)
    }
}

/// Counter store backed by a shared Redis instance.
///
/// Uses RPUSH/EXPIRE, LRANGE and LTRIM so the stored value is a plain list
/// of epoch-millisecond strings. Every call is bounded by `op_timeout`;
/// a timeout is reported as [`StoreError::Timeout`].
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCounterStore {
    /// Connect to Redis at `url`.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(StoreError::backend)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(StoreError::backend)?;
        debug!(%url, "Connected to Redis counter store");
        Ok(Self { conn, op_timeout })
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = redis::RedisResult<T>> + Send,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.op_timeout.as_millis() as u64))?
            .map_err(StoreError::backend)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn append(&self, key: &str, timestamp_ms: i64, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let ttl_secs = ttl.as_secs().max(1) as i64;
        let mut pipe = redis::pipe();
        pipe.rpush(key, timestamp_ms).ignore();
        pipe.expire(key, ttl_secs).ignore();
        let _: () = self.bounded(pipe.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<i64>, StoreError> {
        let mut conn = self.conn.clone();
        let timestamps: Vec<i64> = self.bounded(conn.lrange(key, 0, -1)).await?;
        Ok(timestamps)
    }

    async fn trim_front(&self, key: &str, keep_from: usize) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded(conn.ltrim(key, keep_from as isize, -1))
            .await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let keys: Vec<String> = self.bounded(conn.keys(&pattern)).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = self.bounded(conn.del(keys)).await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_list_preserve_order() {
        let store = MemoryCounterStore::new();
        let ttl = Duration::from_secs(60);

        store.append("rl:test:1.2.3.4", 100, ttl).await.unwrap();
        store.append("rl:test:1.2.3.4", 200, ttl).await.unwrap();
        store.append("rl:test:1.2.3.4", 300, ttl).await.unwrap();

        let timestamps = store.list("rl:test:1.2.3.4").await.unwrap();
        assert_eq!(timestamps, vec![100, 200, 300]);
    }

    #[tokio::test]
    async fn missing_key_lists_empty() {
        let store = MemoryCounterStore::new();
        assert!(store.list("rl:test:nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn trim_front_keeps_suffix() {
        let store = MemoryCounterStore::new();
        let ttl = Duration::from_secs(60);
        for ts in [10, 20, 30, 40] {
            store.append("k", ts, ttl).await.unwrap();
        }

        store.trim_front("k", 2).await.unwrap();
        assert_eq!(store.list("k").await.unwrap(), vec![30, 40]);

        // Trimming past the end empties the list without error
        store.trim_front("k", 10).await.unwrap();
        assert!(store.list("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_prefix_only_removes_matching_keys() {
        let store = MemoryCounterStore::new();
        let ttl = Duration::from_secs(60);
        store.append("rl:contact:a", 1, ttl).await.unwrap();
        store.append("rl:contact:b", 1, ttl).await.unwrap();
        store.append("rl:auth:a", 1, ttl).await.unwrap();

        let removed = store.delete_prefix("rl:contact:").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.list("rl:contact:a").await.unwrap().is_empty());
        assert_eq!(store.list("rl:auth:a").await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn expired_key_reads_empty() {
        let store = MemoryCounterStore::new();
        store.append("k", 1, Duration::ZERO).await.unwrap();
        assert!(store.list("k").await.unwrap().is_empty());
    }
}
