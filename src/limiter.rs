// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter.
//!
//! Each check reads the timestamp log for `{key_prefix}{identifier}`, prunes
//! entries older than the policy window, compares the survivors against the
//! quota and, when allowed, records the new request. The read-check-write
//! sequence is not atomic: concurrent checks on one identifier can both pass
//! just under the limit. The limiter is exact under sequential access and
//! approximate under concurrency.
//!
//! Store failures fail open: a broken counter store must never turn into a
//! site-wide outage. Every such event is logged and counted.

use crate::config::PolicyConfig;
use crate::error::PolicyError;
use crate::metrics;
use crate::store::CounterStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A named rate-limit policy: quota, window, key namespace.
///
/// Validated at construction; a zero quota or window is a programmer error
/// and never reaches the request path.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    name: String,
    max_requests: u32,
    window_ms: i64,
    key_prefix: String,
}

impl RatePolicy {
    /// Create a policy. Fails fast on a zero/negative quota or window.
    pub fn new(
        name: impl Into<String>,
        max_requests: u32,
        window_ms: i64,
        key_prefix: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        let name = name.into();
        if max_requests == 0 {
            return Err(PolicyError::ZeroMaxRequests { name });
        }
        if window_ms <= 0 {
            return Err(PolicyError::ZeroWindow { name });
        }
        Ok(Self {
            name,
            max_requests,
            window_ms,
            key_prefix: key_prefix.into(),
        })
    }

    /// Build a policy from its config section.
    pub fn from_config(
        name: &str,
        config: &PolicyConfig,
        key_prefix: &str,
    ) -> Result<Self, PolicyError> {
        Self::new(
            name,
            config.max_requests,
            (config.window_secs as i64).saturating_mul(1000),
            key_prefix,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn key(&self, identifier: &str) -> String {
        format!("{}{}", self.key_prefix, identifier)
    }

    /// Key TTL: the window rounded up to whole seconds.
    fn ttl(&self) -> Duration {
        Duration::from_secs(((self.window_ms + 999) / 1000) as u64)
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    /// The request is within quota and has been recorded.
    Allowed {
        /// Policy quota, for `X-RateLimit-Limit`.
        limit: u32,
        /// Requests left in the current window.
        remaining: u32,
        /// When the window resets (epoch milliseconds).
        reset_at_ms: i64,
    },
    /// The request exceeds quota and was not recorded.
    Limited {
        limit: u32,
        /// Whole seconds until a retry can succeed, for `Retry-After`.
        retry_after_secs: u64,
        reset_at_ms: i64,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Sliding-window rate limiter over an injected counter store.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Check whether a request for `identifier` is within `policy`'s quota,
    /// recording it if so.
    pub async fn check(&self, policy: &RatePolicy, identifier: &str) -> RateDecision {
        self.check_at(policy, identifier, Utc::now().timestamp_millis())
            .await
    }

    /// [`check`](Self::check) against an explicit clock. Embedding callers
    /// that carry their own clock (and the test suite) use this directly.
    pub async fn check_at(
        &self,
        policy: &RatePolicy,
        identifier: &str,
        now_ms: i64,
    ) -> RateDecision {
        let key = policy.key(identifier);
        let window_start = now_ms - policy.window_ms;

        let timestamps = match self.store.list(&key).await {
            Ok(timestamps) => timestamps,
            Err(err) => {
                metrics::STORE_FAILURES.inc();
                warn!(
                    policy = policy.name(),
                    %key,
                    error = %err,
                    "Counter store read failed; failing open"
                );
                return RateDecision::Allowed {
                    limit: policy.max_requests,
                    remaining: policy.max_requests,
                    reset_at_ms: now_ms + policy.window_ms,
                };
            }
        };

        // Timestamps are appended in arrival order, so the stale ones form
        // a prefix.
        let stale = timestamps
            .iter()
            .take_while(|&&ts| ts <= window_start)
            .count();
        if stale > 0 {
            if let Err(err) = self.store.trim_front(&key, stale).await {
                metrics::STORE_FAILURES.inc();
                warn!(policy = policy.name(), %key, error = %err, "Counter store trim failed");
            }
        }

        let valid = &timestamps[stale..];
        let count = valid.len() as u32;

        if count >= policy.max_requests {
            let oldest = valid[0];
            let reset_at_ms = oldest + policy.window_ms;
            let retry_after_secs = ((reset_at_ms - now_ms).max(0) as u64 + 999) / 1000;
            debug!(
                policy = policy.name(),
                identifier, count, retry_after_secs, "Rate limit exceeded"
            );
            return RateDecision::Limited {
                limit: policy.max_requests,
                retry_after_secs,
                reset_at_ms,
            };
        }

        if let Err(err) = self.store.append(&key, now_ms, policy.ttl()).await {
            metrics::STORE_FAILURES.inc();
            warn!(
                policy = policy.name(),
                %key,
                error = %err,
                "Counter store append failed; request allowed without being recorded"
            );
        }

        RateDecision::Allowed {
            limit: policy.max_requests,
            remaining: policy.max_requests - (count + 1),
            reset_at_ms: now_ms + policy.window_ms,
        }
    }
}
