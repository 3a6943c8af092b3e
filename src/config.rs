// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the ingress guard service.
//!
//! Default quotas match the endpoint classes the guard protects:
//! contact form (5 requests / hour), auth (10 requests / 15 minutes),
//! generic API (100 requests / hour).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the ingress guard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection URL; in-memory counters are used when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Per-scope rate-limit policies
    #[serde(default)]
    pub policies: PoliciesConfig,

    /// Abuse heuristics configuration
    #[serde(default)]
    pub abuse: AbuseConfig,

    /// CAPTCHA verification configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Background cleanup configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Store access configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// One named rate-limit policy: a quota over a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Maximum requests per window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_secs: u64,
}

/// The three endpoint classes the guard protects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoliciesConfig {
    /// Contact-form submissions (default: 5 / hour)
    #[serde(default = "default_contact_policy")]
    pub contact: PolicyConfig,

    /// Authentication attempts (default: 10 / 15 minutes)
    #[serde(default = "default_auth_policy")]
    pub auth: PolicyConfig,

    /// Generic API traffic (default: 100 / hour)
    #[serde(default = "default_api_policy")]
    pub api: PolicyConfig,
}

/// Abuse heuristics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbuseConfig {
    /// Blacklist duration applied on detected abuse, in hours.
    /// Zero or negative means indefinite (default: 24)
    #[serde(default = "default_blacklist_hours")]
    pub blacklist_hours: i64,

    /// Retention for failed-attempt records, in hours (default: 24)
    #[serde(default = "default_attempt_retention_hours")]
    pub attempt_retention_hours: i64,
}

/// CAPTCHA verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    /// Enable token verification (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Shared secret for the verification service
    #[serde(default)]
    pub secret: String,

    /// Verification endpoint (default: Google reCAPTCHA siteverify)
    #[serde(default = "default_captcha_verify_url")]
    pub verify_url: String,
}

/// Background cleanup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Sweep interval in seconds (default: 3600)
    #[serde(default = "default_cleanup_interval_secs")]
    pub interval_secs: u64,
}

/// Store access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Per-operation timeout in milliseconds (default: 500).
    /// A timed-out operation counts as a store failure and fails open.
    #[serde(default = "default_store_timeout_ms")]
    pub op_timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_contact_policy() -> PolicyConfig {
    PolicyConfig {
        max_requests: 5,
        window_secs: 3600,
    }
}

fn default_auth_policy() -> PolicyConfig {
    PolicyConfig {
        max_requests: 10,
        window_secs: 900,
    }
}

fn default_api_policy() -> PolicyConfig {
    PolicyConfig {
        max_requests: 100,
        window_secs: 3600,
    }
}

fn default_blacklist_hours() -> i64 {
    24
}

fn default_attempt_retention_hours() -> i64 {
    24
}

fn default_captcha_verify_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

fn default_store_timeout_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            redis_url: None,
            policies: PoliciesConfig::default(),
            abuse: AbuseConfig::default(),
            captcha: CaptchaConfig::default(),
            cleanup: CleanupConfig::default(),
            store: StoreConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            contact: default_contact_policy(),
            auth: default_auth_policy(),
            api: default_api_policy(),
        }
    }
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            blacklist_hours: default_blacklist_hours(),
            attempt_retention_hours: default_attempt_retention_hours(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            secret: String::new(),
            verify_url: default_captcha_verify_url(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            op_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl CleanupConfig {
    /// Get the sweep interval
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl StoreConfig {
    /// Get the per-operation timeout
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
