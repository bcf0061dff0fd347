// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deterministic per-topic UDP port derivation.
//!
//! Every process on a host must resolve the same (domain, topic) pair to
//! the same port without coordination, so the derivation uses FNV-1a (a
//! fixed, process-independent hash) rather than the standard library's
//! randomized hasher:
//!
//! ```text
//! h1   = fnv1a_64(topic)
//! h2   = fnv1a_64("<domain>_<h1>")
//! port = 40000 + (h2 % 10000)
//! ```

use crate::config::{FNV1A_OFFSET_BASIS_64, FNV1A_PRIME_64, USER_PORT_BASE, USER_PORT_RANGE};
use crate::dds::DomainId;

/// FNV-1a 64-bit hash of a string.
#[must_use]
pub fn fnv1a_64(s: &str) -> u64 {
    let mut hash = FNV1A_OFFSET_BASIS_64;
    for &byte in s.as_bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV1A_PRIME_64);
    }
    hash
}

/// Derive the UDP port for a (domain, topic) pair.
///
/// Deterministic across processes and runs; lands in
/// `[40000, 50000)`. Distinct topics may collide (10k slots), which is
/// acceptable for best-effort delivery and mirrors the original scheme.
#[must_use]
pub fn derive_topic_port(domain_id: DomainId, topic: &str) -> u16 {
    let topic_hash = fnv1a_64(topic);
    let combined = fnv1a_64(&format!("{domain_id}_{topic_hash}"));
    USER_PORT_BASE + (combined % u64::from(USER_PORT_RANGE)) as u16
}
