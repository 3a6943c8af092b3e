// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for guard outcomes and infrastructure failures.

use lazy_static::lazy_static;
use prometheus::{register_counter, Counter, TextEncoder};

lazy_static! {
    pub static ref REQUESTS_ALLOWED: Counter = register_counter!(
        "ingress_guard_requests_allowed_total",
        "Requests that passed the blacklist and rate-limit checks"
    )
    .unwrap();
    pub static ref REQUESTS_RATE_LIMITED: Counter = register_counter!(
        "ingress_guard_requests_rate_limited_total",
        "Requests rejected for exceeding a policy quota"
    )
    .unwrap();
    pub static ref REQUESTS_BLACKLISTED: Counter = register_counter!(
        "ingress_guard_requests_blacklisted_total",
        "Requests rejected because the client IP is blacklisted"
    )
    .unwrap();
    pub static ref STORE_FAILURES: Counter = register_counter!(
        "ingress_guard_store_failures_total",
        "Counter/ledger store operations that failed (fail-open events)"
    )
    .unwrap();
    pub static ref CAPTCHA_CHALLENGES: Counter = register_counter!(
        "ingress_guard_captcha_challenges_total",
        "Times the failed-attempt heuristic required a CAPTCHA"
    )
    .unwrap();
    pub static ref CAPTCHA_FAILURES: Counter = register_counter!(
        "ingress_guard_captcha_failures_total",
        "CAPTCHA tokens that were rejected or could not be verified"
    )
    .unwrap();
}

/// Render all registered metrics in the Prometheus text format.
pub fn render() -> String {
    let metric_families = prometheus::gather();
    TextEncoder::new()
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
