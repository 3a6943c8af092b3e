// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request gate: the composition layer wrapping protected handlers.
//!
//! Fixed check order: blacklist first, then rate limit, then the handler.
//! A blacklisted client is never told it was also over quota, and the
//! wrapped handler never runs for a rejected request. The gate itself is
//! stateless; all state lives in the counter store and ledgers.

use crate::abuse::AbuseGuard;
use crate::limiter::{RateDecision, RateLimiter, RatePolicy};
use crate::metrics;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Quota metadata attached to allowed responses
/// (`X-RateLimit-Limit` / `-Remaining` / `-Reset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

/// Outcome of a guarded call.
#[derive(Debug)]
pub enum GateOutcome<T> {
    /// Checks passed; the handler ran.
    Completed { response: T, quota: Quota },
    /// The client IP is blacklisted. Handler not invoked. Surfaced as a
    /// generic access-denied response without details.
    Blocked,
    /// The request exceeds the policy quota. Handler not invoked.
    Limited {
        limit: u32,
        retry_after_secs: u64,
        reset_at_ms: i64,
    },
}

/// Wraps request handlers with the blacklist and rate-limit checks.
pub struct RequestGate {
    limiter: RateLimiter,
    abuse: Arc<AbuseGuard>,
}

impl RequestGate {
    pub fn new(limiter: RateLimiter, abuse: Arc<AbuseGuard>) -> Self {
        Self { limiter, abuse }
    }

    pub fn abuse(&self) -> &Arc<AbuseGuard> {
        &self.abuse
    }

    /// Run `handler` for a request from `ip`, rate-limited under
    /// `policy` scoped to `identifier` (the client IP alone, or ip+path for
    /// generic API traffic).
    pub async fn guard<H, Fut, T>(
        &self,
        policy: &RatePolicy,
        ip: &str,
        identifier: &str,
        handler: H,
    ) -> GateOutcome<T>
    where
        H: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.guard_at(policy, ip, identifier, Utc::now().timestamp_millis(), handler)
            .await
    }

    /// [`guard`](Self::guard) against an explicit clock.
    pub async fn guard_at<H, Fut, T>(
        &self,
        policy: &RatePolicy,
        ip: &str,
        identifier: &str,
        now_ms: i64,
        handler: H,
    ) -> GateOutcome<T>
    where
        H: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let now = DateTime::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now);

        if self.abuse.is_blacklisted_at(ip, now).await {
            metrics::REQUESTS_BLACKLISTED.inc();
            info!(ip, policy = policy.name(), "Request blocked: blacklisted");
            return GateOutcome::Blocked;
        }

        match self.limiter.check_at(policy, identifier, now_ms).await {
            RateDecision::Limited {
                limit,
                retry_after_secs,
                reset_at_ms,
            } => {
                metrics::REQUESTS_RATE_LIMITED.inc();
                info!(
                    ip,
                    policy = policy.name(),
                    retry_after_secs,
                    "Request rate limited"
                );
                GateOutcome::Limited {
                    limit,
                    retry_after_secs,
                    reset_at_ms,
                }
            }
            RateDecision::Allowed {
                limit,
                remaining,
                reset_at_ms,
            } => {
                metrics::REQUESTS_ALLOWED.inc();
                let response = handler().await;
                GateOutcome::Completed {
                    response,
                    quota: Quota {
                        limit,
                        remaining,
                        reset_at_ms,
                    },
                }
            }
        }
    }
}
