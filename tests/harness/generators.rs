// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for attack simulation.

/// Generate a pool of distinct IP address strings.
pub fn generate_ips(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = (i >> 16) & 0xFF;
            let b = (i >> 8) & 0xFF;
            let c = i & 0xFF;
            format!("10.{a}.{b}.{c}")
        })
        .collect()
}

/// Generate a pool of email identifiers.
pub fn generate_emails(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("user-{i}@victim.example.com"))
        .collect()
}

/// Generate a pool of user-agent strings.
pub fn generate_user_agents(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("attack-client/{}.{}", i / 10, i % 10))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ips_are_unique() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn generated_emails_are_unique() {
        let emails = generate_emails(100);
        assert_eq!(emails.len(), 100);
        let unique: std::collections::HashSet<_> = emails.iter().collect();
        assert_eq!(unique.len(), 100);
    }
}
