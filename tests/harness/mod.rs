// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for ingress guard attack simulation.
//!
//! This module provides utilities for simulating abuse patterns (floods,
//! credential stuffing, blacklist probing) against the request gate to
//! validate the security controls.

pub mod attacks;
pub mod generators;
pub mod metrics;
