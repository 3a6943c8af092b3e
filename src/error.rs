// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the ingress guard.
//!
//! Infrastructure failures (`StoreError`) are swallowed at the limiter /
//! abuse-guard boundary and converted to permissive defaults (fail-open).
//! Policy violations are not errors here: they are explicit variants of
//! [`crate::limiter::RateDecision`] and [`crate::gate::GateOutcome`].

use thiserror::Error;

/// Failure reaching the counter store or ledger store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation timed out after {0} ms")]
    Timeout(u64),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Programmer error in rate-limit policy construction.
///
/// Raised at construction time so a zero/negative quota or window can never
/// reach the request path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid policy {name:?}: max_requests must be positive")]
    ZeroMaxRequests { name: String },

    #[error("invalid policy {name:?}: window_ms must be positive")]
    ZeroWindow { name: String },
}

/// CAPTCHA verification failure.
///
/// Covers both "the verification service errored" and "the service answered
/// but the token was rejected"; either way the challenge is not satisfied.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("captcha verification service unreachable: {0}")]
    Unreachable(String),

    #[error("captcha verification service returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("captcha token rejected")]
    TokenRejected,
}
