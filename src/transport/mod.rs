// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport layer: shared-memory and UDP delivery plus the per-domain
//! transport manager.
//!
//! # Modules
//!
//! - `shm` - per-topic shared-memory ring buffers (same-host IPC)
//! - `udp` - per-topic broadcast datagram sockets (host-to-host)
//! - `ports` - deterministic topic-to-port derivation
//! - `manager` - process-wide registry routing operations per domain
//!
//! Transport kinds are modeled as a tagged variant ([`Transport`]) with a
//! closed operation set rather than a trait-object hierarchy; the
//! dispatch cost is a match and the set of kinds is fixed.

pub mod manager;
pub mod ports;
pub mod shm;
pub mod udp;

pub use manager::TransportManager;
pub use ports::derive_topic_port;
pub use shm::SharedMemoryTransport;
pub use udp::UdpTransport;

use crate::config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_MESSAGE_SIZE};
use crate::dds::{DomainId, Result};
use std::fmt;
use std::net::Ipv4Addr;

/// Which transport a participant uses for its topics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Broadcast UDP datagrams (default)
    #[default]
    Udp,
    /// Shared-memory ring buffers (same host only)
    SharedMemory,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "UDP"),
            Self::SharedMemory => write!(f, "SHARED_MEMORY"),
        }
    }
}

/// Sizing and addressing knobs applied when a transport is constructed.
///
/// Captured per participant and frozen together with the transport kind
/// once the first publisher or subscriber exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// Ring data bytes per shared-memory topic segment
    pub buffer_size: u32,
    /// Maximum frame size (header + payload) per shared-memory message
    pub max_message_size: u32,
    /// UDP destination override; broadcast when `None`
    pub address: Option<Ipv4Addr>,
    /// UDP port override; per-topic derivation when `None`
    pub port: Option<u16>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            address: None,
            port: None,
        }
    }
}

/// A constructed transport instance, tagged by kind.
///
/// Construction performs the per-kind initialization; the per-topic OS
/// work happens in `advertise`/`subscribe`.
pub enum Transport {
    /// Broadcast UDP
    Udp(UdpTransport),
    /// Shared-memory rings
    SharedMemory(SharedMemoryTransport),
}

impl Transport {
    /// Build a transport of `kind` for a domain.
    #[must_use]
    pub fn create(
        domain_id: DomainId,
        participant_name: &str,
        config: &TransportConfig,
        kind: TransportKind,
    ) -> Self {
        match kind {
            TransportKind::Udp => Self::Udp(UdpTransport::with_destination(
                domain_id,
                participant_name,
                config.address.unwrap_or(Ipv4Addr::BROADCAST),
                config.port,
            )),
            TransportKind::SharedMemory => Self::SharedMemory(SharedMemoryTransport::new(
                domain_id,
                participant_name,
                config.buffer_size,
                config.max_message_size,
            )),
        }
    }

    /// Kind tag of this transport.
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Udp(_) => TransportKind::Udp,
            Self::SharedMemory(_) => TransportKind::SharedMemory,
        }
    }

    /// Domain this transport serves.
    #[must_use]
    pub fn domain_id(&self) -> DomainId {
        match self {
            Self::Udp(t) => t.domain_id(),
            Self::SharedMemory(t) => t.domain_id(),
        }
    }

    /// Prepare the send side of a topic. Idempotent.
    pub fn advertise(&self, topic: &str) -> Result<()> {
        match self {
            Self::Udp(t) => t.advertise(topic),
            Self::SharedMemory(t) => t.advertise(topic).map_err(Into::into),
        }
    }

    /// Prepare the receive side of a topic. Idempotent.
    pub fn subscribe(&self, topic: &str) -> Result<()> {
        match self {
            Self::Udp(t) => t.subscribe(topic),
            Self::SharedMemory(t) => t.subscribe(topic).map_err(Into::into),
        }
    }

    /// Send one payload on a topic; never blocks.
    pub fn send(&self, topic: &str, payload: &[u8]) -> Result<()> {
        match self {
            Self::Udp(t) => t.send(topic, payload),
            Self::SharedMemory(t) => t.send(topic, payload).map_err(Into::into),
        }
    }

    /// Receive one payload from a topic; `Ok(None)` when nothing is
    /// pending. Never blocks.
    pub fn receive(&self, topic: &str, buf: &mut [u8]) -> Result<Option<usize>> {
        match self {
            Self::Udp(t) => t.receive(topic, buf),
            Self::SharedMemory(t) => t.receive(topic, buf).map_err(Into::into),
        }
    }
}
