// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome accounting for attack simulation runs.

use std::collections::HashMap;

/// Possible outcomes for a simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    RateLimited,
    Blacklisted,
    CaptchaRequired,
}

/// Collects outcomes during an attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    outcomes: HashMap<Outcome, usize>,
    requests_per_ip: HashMap<String, usize>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, ip: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_ip.entry(ip.to_string()).or_insert(0) += 1;
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Ratio of rejected requests to total.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let allowed = self.count(Outcome::Allowed);
        (total - allowed) as f64 / total as f64
    }

    pub fn unique_ips(&self) -> usize {
        self.requests_per_ip.len()
    }

    /// Generate a summary report.
    pub fn report(&self) -> AttackReport {
        AttackReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            rate_limited: self.count(Outcome::RateLimited),
            blacklisted: self.count(Outcome::Blacklisted),
            captcha_required: self.count(Outcome::CaptchaRequired),
            block_rate: self.block_rate(),
            unique_ips: self.unique_ips(),
        }
    }
}

/// Summary report of an attack run.
#[derive(Debug, Clone)]
pub struct AttackReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub rate_limited: usize,
    pub blacklisted: usize,
    pub captcha_required: usize,
    pub block_rate: f64,
    pub unique_ips: usize,
}

impl std::fmt::Display for AttackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Report ===")?;
        writeln!(f, "Total Requests:   {}", self.total_requests)?;
        writeln!(f, "Allowed:          {}", self.allowed)?;
        writeln!(f, "Rate Limited:     {}", self.rate_limited)?;
        writeln!(f, "Blacklisted:      {}", self.blacklisted)?;
        writeln!(f, "Captcha Required: {}", self.captcha_required)?;
        writeln!(f, "Block Rate:       {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Unique IPs:       {}", self.unique_ips)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accounting() {
        let mut metrics = AttackMetrics::new();
        metrics.record(Outcome::Allowed, "10.0.0.1");
        metrics.record(Outcome::Allowed, "10.0.0.2");
        metrics.record(Outcome::RateLimited, "10.0.0.1");

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.unique_ips(), 2);
    }

    #[test]
    fn block_rate_ratio() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, "10.0.0.1");
        }
        for _ in 0..7 {
            metrics.record(Outcome::RateLimited, "10.0.0.1");
        }
        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }
}
