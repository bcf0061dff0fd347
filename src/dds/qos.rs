// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Quality-of-Service policies.
//!
//! Policies are accepted, stored, and carried through the declarative
//! configuration, but the transport layer only implements best-effort
//! volatile delivery; the other values are matching metadata.

use serde::{Deserialize, Serialize};

/// Delivery guarantee requested by an endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reliability {
    /// Samples may be lost; nothing is retransmitted (implemented)
    #[default]
    BestEffort,
    /// Accepted and stored; behaves as best-effort at this layer
    Reliable,
}

/// How long samples outlive their writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Durability {
    /// Samples exist only in transit (implemented)
    #[default]
    Volatile,
    /// Accepted and stored; behaves as volatile at this layer
    TransientLocal,
    /// Accepted and stored; behaves as volatile at this layer
    Transient,
    /// Accepted and stored; behaves as volatile at this layer
    Persistent,
}

/// QoS policy set attached to an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QoS {
    /// Delivery guarantee
    pub reliability: Reliability,
    /// Sample lifetime
    pub durability: Durability,
}

impl QoS {
    /// Best-effort, volatile: the behavior this layer implements.
    #[must_use]
    pub fn best_effort() -> Self {
        Self {
            reliability: Reliability::BestEffort,
            durability: Durability::Volatile,
        }
    }

    /// Reliable delivery request (stored; delivered best-effort here).
    #[must_use]
    pub fn reliable() -> Self {
        Self {
            reliability: Reliability::Reliable,
            ..Self::default()
        }
    }
}
