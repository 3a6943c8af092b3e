// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Attack patterns for security testing.

/// Attack pattern configuration.
///
/// Requests are replayed against the gate on a simulated clock, so a run
/// covering hours of traffic finishes in milliseconds.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated milliseconds between consecutive requests
    pub spacing_ms: i64,
    /// Number of unique IPs to rotate through
    pub unique_ips: usize,
    /// Number of unique email identifiers to rotate through
    pub unique_emails: usize,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            spacing_ms: 100,
            unique_ips: 1,
            unique_emails: 1,
        }
    }
}

impl AttackConfig {
    /// Single IP hammering one endpoint as fast as it can.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            spacing_ms: 10,
            unique_ips: 1,
            ..Default::default()
        }
    }

    /// Many IPs, each staying under its own quota.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            spacing_ms: 50,
            unique_ips: 100,
            ..Default::default()
        }
    }

    /// One identity attacked from rotating IPs (credential stuffing).
    pub fn credential_stuffing() -> Self {
        Self {
            total_requests: 20,
            spacing_ms: 30_000,
            unique_ips: 20,
            unique_emails: 1,
        }
    }

    /// Requests spaced widely enough to stay inside every quota.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 50,
            spacing_ms: 800_000,
            unique_ips: 1,
            ..Default::default()
        }
    }
}
