// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse heuristics: failed-attempt tracking, CAPTCHA escalation and IP
//! blacklisting.
//!
//! Lookup failures fail open (not blacklisted, no CAPTCHA) so an
//! infrastructure problem cannot lock legitimate users out. Write failures
//! are logged at error level: a dropped attempt record or blacklist entry
//! silently weakens future protection.

use crate::ledger::{BlacklistEntry, FailedAttempt, LedgerStore};
use crate::metrics;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// How many recent failed attempts the CAPTCHA heuristic samples.
const CAPTCHA_SAMPLE: usize = 5;
/// How many of the sampled attempts must be recent to require a CAPTCHA.
const CAPTCHA_THRESHOLD: usize = 3;
/// The trailing window a sampled attempt counts as "recent" within.
const CAPTCHA_WINDOW_HOURS: i64 = 1;
/// Recent failures from one IP, inside the same trailing window, that
/// escalate past the CAPTCHA challenge to a blacklist entry.
const BLACKLIST_THRESHOLD: usize = 10;

/// Failed-attempt ledger, blacklist ledger and escalation decisions.
pub struct AbuseGuard {
    ledger: Arc<dyn LedgerStore>,
    blacklist_hours: i64,
}

impl AbuseGuard {
    /// `blacklist_hours` is the duration applied when the failure-flood
    /// escalation fires; `<= 0` means indefinite.
    pub fn new(ledger: Arc<dyn LedgerStore>, blacklist_hours: i64) -> Self {
        Self {
            ledger,
            blacklist_hours,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    /// Whether `ip` is currently barred: an entry exists with no expiry or
    /// an expiry in the future.
    pub async fn is_blacklisted(&self, ip: &str) -> bool {
        self.is_blacklisted_at(ip, Utc::now()).await
    }

    /// [`is_blacklisted`](Self::is_blacklisted) against an explicit clock.
    pub async fn is_blacklisted_at(&self, ip: &str, now: DateTime<Utc>) -> bool {
        match self.ledger.blacklist_entries(ip).await {
            Ok(entries) => entries.iter().any(|e| e.active_at(now)),
            Err(err) => {
                metrics::STORE_FAILURES.inc();
                warn!(ip, error = %err, "Blacklist lookup failed; treating as not blacklisted");
                false
            }
        }
    }

    /// Bar `ip` for `duration_hours`. Zero or negative means indefinite.
    pub async fn blacklist(&self, ip: &str, reason: &str, duration_hours: i64) {
        let now = Utc::now();
        let expires_at = if duration_hours > 0 {
            Some(now + Duration::hours(duration_hours))
        } else {
            None
        };
        let entry = BlacklistEntry {
            ip: ip.to_string(),
            reason: reason.to_string(),
            created_at: now,
            expires_at,
        };
        warn!(ip, reason, ?expires_at, "Blacklisting IP");
        if let Err(err) = self.ledger.insert_blacklist(entry).await {
            metrics::STORE_FAILURES.inc();
            error!(ip, error = %err, "Failed to persist blacklist entry");
        }
    }

    /// Record a failed authentication attempt. A sustained flood from one
    /// IP escalates to a blacklist entry for [`Self::new`]'s
    /// `blacklist_hours`.
    pub async fn record_failed_attempt(&self, ip: &str, email: &str, user_agent: &str) {
        self.record_failed_attempt_at(ip, email, user_agent, Utc::now())
            .await;
    }

    /// [`record_failed_attempt`](Self::record_failed_attempt) against an
    /// explicit clock.
    pub async fn record_failed_attempt_at(
        &self,
        ip: &str,
        email: &str,
        user_agent: &str,
        now: DateTime<Utc>,
    ) {
        let attempt = FailedAttempt {
            ip: ip.to_string(),
            email: email.to_string(),
            user_agent: user_agent.to_string(),
            at: now,
        };
        debug!(ip, email, "Recording failed attempt");
        if let Err(err) = self.ledger.insert_attempt(attempt).await {
            metrics::STORE_FAILURES.inc();
            error!(ip, email, error = %err, "Failed to record failed attempt");
            return;
        }
        self.escalate_if_flooding(ip, email, now).await;
    }

    /// Blacklist `ip` once the failure flood is clearly attributable to it:
    /// the [`BLACKLIST_THRESHOLD`] most recent matching attempts all came
    /// from `ip` within the trailing hour.
    async fn escalate_if_flooding(&self, ip: &str, email: &str, now: DateTime<Utc>) {
        let attempts = match self
            .ledger
            .recent_attempts(ip, email, BLACKLIST_THRESHOLD)
            .await
        {
            Ok(attempts) => attempts,
            Err(err) => {
                metrics::STORE_FAILURES.inc();
                warn!(ip, email, error = %err, "Attempt lookup failed; skipping escalation");
                return;
            }
        };
        if attempts.len() < BLACKLIST_THRESHOLD {
            return;
        }

        let window_start = now - Duration::hours(CAPTCHA_WINDOW_HOURS);
        let flooding = attempts
            .iter()
            .filter(|a| a.ip == ip && a.at > window_start)
            .count();
        if flooding >= BLACKLIST_THRESHOLD && !self.is_blacklisted_at(ip, now).await {
            self.blacklist(ip, "repeated authentication failures", self.blacklist_hours)
                .await;
        }
    }

    /// Clear the failed-attempt history for `email` after a successful login.
    pub async fn clear_failed_attempts(&self, email: &str) -> u64 {
        match self.ledger.clear_attempts(email).await {
            Ok(cleared) => {
                debug!(email, cleared, "Cleared failed attempts");
                cleared
            }
            Err(err) => {
                metrics::STORE_FAILURES.inc();
                error!(email, error = %err, "Failed to clear attempt history");
                0
            }
        }
    }

    /// Whether subsequent attempts from `ip` / for `email` must present a
    /// CAPTCHA: at least 3 of the 5 most recent matching failures happened
    /// within the trailing hour.
    pub async fn requires_captcha(&self, ip: &str, email: &str) -> bool {
        self.requires_captcha_at(ip, email, Utc::now()).await
    }

    /// [`requires_captcha`](Self::requires_captcha) against an explicit clock.
    pub async fn requires_captcha_at(&self, ip: &str, email: &str, now: DateTime<Utc>) -> bool {
        let attempts = match self.ledger.recent_attempts(ip, email, CAPTCHA_SAMPLE).await {
            Ok(attempts) => attempts,
            Err(err) => {
                metrics::STORE_FAILURES.inc();
                warn!(ip, email, error = %err, "Attempt lookup failed; not requiring captcha");
                return false;
            }
        };

        if attempts.len() < CAPTCHA_THRESHOLD {
            return false;
        }

        let window_start = now - Duration::hours(CAPTCHA_WINDOW_HOURS);
        let recent = attempts.iter().filter(|a| a.at > window_start).count();
        if recent >= CAPTCHA_THRESHOLD {
            metrics::CAPTCHA_CHALLENGES.inc();
            debug!(ip, email, recent, "Captcha required");
            true
        } else {
            false
        }
    }
}
