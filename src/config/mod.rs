// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration - constants and the declarative YAML loader.
//!
//! This module centralizes the wire and sizing constants shared by the
//! transports. **Never hardcode these elsewhere!**
//!
//! - Level 1 (static): compile-time constants (frame magic, default ring
//!   sizing, port derivation parameters).
//! - Level 2 (declarative): [`Config`] / [`ConfigLoader`] build a whole
//!   entity graph from a YAML description (see `yaml.rs` for the file
//!   format).

mod loader;
mod yaml;

pub use loader::ConfigLoader;
pub use yaml::{
    Config, ParticipantConfig, PublisherConfig, SubscriberConfig, TopicConfig, TransportSection,
    TransportType,
};

use std::time::Duration;

// =======================================================================
// Shared-memory frame constants (cross-process contract)
// =======================================================================

/// Magic number identifying a valid frame header ("SHDD" in ASCII).
pub const MESSAGE_MAGIC: u32 = 0x4444_5348;

/// Prefix of every shared-memory segment name: `/tiny_dds_<domain>_<topic>`.
///
/// The leading `/` is part of the POSIX object name. Other processes
/// derive the same name independently, so this is a cross-process
/// contract and must never change between releases.
pub const SEGMENT_NAME_PREFIX: &str = "/tiny_dds_";

/// Default ring-buffer data size per topic segment (1 MiB).
pub const DEFAULT_BUFFER_SIZE: u32 = 1024 * 1024;

/// Default maximum frame size (header + payload, 64 KiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 64 * 1024;

// =======================================================================
// UDP port derivation (cross-process contract)
// =======================================================================

/// Base of the per-topic UDP port range.
pub const USER_PORT_BASE: u16 = 40_000;

/// Size of the per-topic UDP port range: ports land in
/// `[USER_PORT_BASE, USER_PORT_BASE + USER_PORT_RANGE)`.
pub const USER_PORT_RANGE: u32 = 10_000;

/// FNV-1a 64-bit offset basis (port derivation hash).
pub const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime (port derivation hash).
pub const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01b3;

// =======================================================================
// Dispatch
// =======================================================================

/// Poll cadence of the subscriber delivery task.
pub const DELIVERY_POLL_INTERVAL: Duration = Duration::from_millis(10);
