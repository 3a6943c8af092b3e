// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Security tests for the ingress guard.
//!
//! These tests replay abuse patterns against the request gate on a
//! simulated clock and validate that the controls mitigate them.

mod harness;

use harness::{
    attacks::AttackConfig,
    generators,
    metrics::{AttackMetrics, Outcome},
};
use ingress_guard::{
    abuse::AbuseGuard,
    gate::{GateOutcome, RequestGate},
    ledger::MemoryLedgerStore,
    limiter::{RateLimiter, RatePolicy},
    store::MemoryCounterStore,
};
use std::sync::Arc;

const BASE_MS: i64 = 1_700_000_000_000;

fn contact_policy() -> RatePolicy {
    RatePolicy::new("contact", 5, 3_600_000, "rl:contact:").unwrap()
}

fn auth_policy() -> RatePolicy {
    RatePolicy::new("auth", 10, 900_000, "rl:auth:").unwrap()
}

fn gate() -> RequestGate {
    let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::new()));
    let abuse = Arc::new(AbuseGuard::new(Arc::new(MemoryLedgerStore::new()), 24));
    RequestGate::new(limiter, abuse)
}

/// Replay an attack against the gate, rotating through the IP pool.
async fn run_attack(gate: &RequestGate, policy: &RatePolicy, config: &AttackConfig) -> AttackMetrics {
    let ips = generators::generate_ips(config.unique_ips);
    let mut metrics = AttackMetrics::new();

    for i in 0..config.total_requests {
        let now = BASE_MS + i as i64 * config.spacing_ms;
        let ip = &ips[i % ips.len()];
        let outcome = gate.guard_at(policy, ip, ip, now, || async {}).await;
        let outcome = match outcome {
            GateOutcome::Completed { .. } => Outcome::Allowed,
            GateOutcome::Limited { .. } => Outcome::RateLimited,
            GateOutcome::Blocked => Outcome::Blacklisted,
        };
        metrics.record(outcome, ip);
    }

    metrics
}

#[tokio::test]
async fn single_ip_flood_is_capped_at_the_quota() {
    let gate = gate();
    let metrics = run_attack(&gate, &contact_policy(), &AttackConfig::single_ip_flood()).await;

    let report = metrics.report();
    println!("{report}");

    // 200 requests in two simulated seconds: only the quota gets through
    assert_eq!(report.allowed, 5);
    assert_eq!(report.rate_limited, 195);
    assert!(report.block_rate >= 0.9);
}

#[tokio::test]
async fn distributed_flood_is_limited_per_ip() {
    let gate = gate();
    let metrics = run_attack(&gate, &contact_policy(), &AttackConfig::distributed_flood()).await;

    let report = metrics.report();
    println!("{report}");

    // 100 IPs x 5 requests each: every IP sits exactly at its own quota
    assert_eq!(report.unique_ips, 100);
    assert_eq!(report.allowed, 500);
    assert_eq!(report.rate_limited, 0);
}

#[tokio::test]
async fn slow_drip_stays_under_the_window() {
    let gate = gate();
    let metrics = run_attack(&gate, &contact_policy(), &AttackConfig::slow_drip()).await;

    let report = metrics.report();
    println!("{report}");

    // 800 s spacing keeps at most 4 earlier requests inside any one-hour window
    assert_eq!(report.allowed, report.total_requests);
}

#[tokio::test]
async fn auth_flood_locks_out_after_quota() {
    let gate = gate();
    let policy = auth_policy();

    let mut allowed = 0;
    for i in 0..30i64 {
        let outcome = gate
            .guard_at(&policy, "6.6.6.6", "6.6.6.6", BASE_MS + i * 1000, || async {})
            .await;
        if matches!(outcome, GateOutcome::Completed { .. }) {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 10);
}

#[tokio::test]
async fn credential_stuffing_escalates_to_captcha() {
    let gate = gate();
    let abuse = gate.abuse();
    let ips = generators::generate_ips(AttackConfig::credential_stuffing().unique_ips);
    let emails = generators::generate_emails(4);
    let agents = generators::generate_user_agents(3);
    let victim = &emails[0];
    let mut metrics = AttackMetrics::new();

    // Two failures are not enough to challenge
    for ip in ips.iter().take(2) {
        abuse.record_failed_attempt(ip, victim, &agents[0]).await;
        metrics.record(Outcome::Allowed, ip);
    }
    assert!(!abuse.requires_captcha("203.0.113.9", victim).await);

    // A third recent failure crosses the threshold, from any IP
    abuse.record_failed_attempt(&ips[2], victim, &agents[1]).await;
    metrics.record(Outcome::CaptchaRequired, &ips[2]);
    assert!(abuse.requires_captcha("203.0.113.9", victim).await);

    // An IP spraying several identities is challenged by IP match alone
    abuse.record_failed_attempt(&ips[0], &emails[1], &agents[2]).await;
    abuse.record_failed_attempt(&ips[0], &emails[2], &agents[2]).await;
    assert!(abuse.requires_captcha(&ips[0], &emails[3]).await);

    let report = metrics.report();
    println!("{report}");
    assert_eq!(report.captcha_required, 1);
}

#[tokio::test]
async fn blacklisted_attacker_never_reaches_the_limiter() {
    let gate = gate();
    gate.abuse()
        .blacklist("10.0.0.0", "credential stuffing", 24)
        .await;

    let metrics = run_attack(&gate, &contact_policy(), &AttackConfig::single_ip_flood()).await;
    let report = metrics.report();
    println!("{report}");

    assert_eq!(report.blacklisted, report.total_requests);
    assert_eq!(report.rate_limited, 0);
    assert_eq!(report.allowed, 0);
}

#[tokio::test]
async fn failure_flood_escalates_to_a_gate_level_block() {
    let gate = gate();
    let abuse = gate.abuse();
    let email = "victim@example.com";

    // Ten rapid failures from one IP: past captcha territory, straight to
    // the blacklist
    for _ in 0..10 {
        abuse.record_failed_attempt("6.6.6.6", email, "client/1.0").await;
    }
    assert!(abuse.is_blacklisted("6.6.6.6").await);

    let outcome: GateOutcome<()> = gate
        .guard(&auth_policy(), "6.6.6.6", "6.6.6.6", || async {})
        .await;
    assert!(matches!(outcome, GateOutcome::Blocked));
}

#[tokio::test]
async fn successful_login_resets_the_escalation() {
    let gate = gate();
    let abuse = gate.abuse();
    let email = "victim@example.com";

    for _ in 0..5 {
        abuse.record_failed_attempt("9.9.9.9", email, "client/1.0").await;
    }
    assert!(abuse.requires_captcha("9.9.9.9", email).await);

    let cleared = abuse.clear_failed_attempts(email).await;
    assert_eq!(cleared, 5);
    assert!(!abuse.requires_captcha("9.9.9.9", email).await);
}
