// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ingress Guard
//!
//! Abuse mitigation for public-facing endpoints (contact form, newsletter
//! signup, login):
//!
//! - Sliding-window rate limiting per named policy (contact / auth / api)
//! - Failed-login tracking with CAPTCHA escalation
//!   (3 recent failures among the last 5 within an hour)
//! - IP blacklisting with optional expiry
//! - A request gate composing blacklist check → rate limit → handler
//! - Periodic cleanup of expired ledger rows
//!
//! Counter and ledger storage sit behind injected traits; Redis backs the
//! counters in shared deployments, in-memory stores back single-process
//! runs and tests. Infrastructure failures fail open and are logged.

pub mod abuse;
pub mod captcha;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod ledger;
pub mod limiter;
pub mod metrics;
pub mod store;

pub use abuse::AbuseGuard;
pub use config::Config;
pub use gate::{GateOutcome, Quota, RequestGate};
pub use ledger::{BlacklistEntry, FailedAttempt, LedgerStore, MemoryLedgerStore};
pub use limiter::{RateDecision, RateLimiter, RatePolicy};
pub use store::{CounterStore, MemoryCounterStore, RedisCounterStore};
