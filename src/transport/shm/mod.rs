// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared Memory (SHM) transport for same-host inter-process delivery.
//!
//! One POSIX shared-memory segment per topic, holding a single-producer
//! ring buffer of framed messages. Processes resolve segments by a
//! deterministic name derived from the domain id and topic, so no
//! coordination is needed beyond the naming contract.
//!
//! # Architecture
//!
//! ```text
//! +------------------+              +------------------+
//! |   Process A      |   Shared     |   Process B      |
//! |   DataWriter     |   Memory     |   DataReader     |
//! |        |         |   (mmap)     |        |         |
//! |        v         |              |        v         |
//! |   Ring::push  ---+--------------+->  Ring::pop     |
//! +------------------+  acq/rel     +------------------+
//!                       indices
//! ```
//!
//! # Key Properties
//!
//! - **Framed**: each message carries a 152-byte header (magic, sequence,
//!   size, timestamp, topic, sender)
//! - **FIFO**: single-writer order is observed by the reader
//! - **Non-blocking**: send rejects when full, receive reports no data
//! - **Self-cleaning**: segments this transport created are unlinked on
//!   drop; segments created by peer processes are left intact

mod ring;
mod segment;

pub use ring::{ring_segment_size, MessageHeader, Ring, RingHeader, HEADER_SIZE, RING_HEADER_SIZE};
pub use segment::ShmSegment;

use crate::config::SEGMENT_NAME_PREFIX;
use crate::dds::DomainId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io;

/// Errors that can occur in SHM transport operations
#[derive(Debug)]
pub enum ShmError {
    /// Shared memory segment creation failed
    SegmentCreate(io::Error),

    /// Shared memory segment open failed
    SegmentOpen(io::Error),

    /// Memory mapping failed
    Mmap(io::Error),

    /// Invalid segment name
    InvalidName(String),

    /// No segment mapped for the topic
    TopicNotFound(String),

    /// Frame (header + payload) exceeds the configured maximum
    FrameTooLarge { size: usize, max: usize },

    /// Not enough free space in the ring for the frame
    BufferFull { needed: usize, available: usize },

    /// Caller's buffer is smaller than the pending frame's payload
    BufferTooSmall { needed: usize, got: usize },

    /// Frame corruption detected during receive (magic mismatch)
    Corruption,

    /// Mapped segment disagrees with this transport's ring sizing
    BufferSizeMismatch { expected: u32, actual: u32 },
}

impl fmt::Display for ShmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SegmentCreate(e) => write!(f, "shared memory segment creation failed: {e}"),
            Self::SegmentOpen(e) => write!(f, "shared memory segment open failed: {e}"),
            Self::Mmap(e) => write!(f, "memory mapping failed: {e}"),
            Self::InvalidName(name) => write!(f, "invalid segment name: {name}"),
            Self::TopicNotFound(topic) => write!(f, "no segment for topic: {topic}"),
            Self::FrameTooLarge { size, max } => {
                write!(f, "frame too large: {size} bytes exceeds maximum {max}")
            }
            Self::BufferFull { needed, available } => {
                write!(
                    f,
                    "ring buffer full: frame needs {needed} bytes, {available} available"
                )
            }
            Self::BufferTooSmall { needed, got } => {
                write!(
                    f,
                    "receive buffer too small: frame holds {needed} bytes, buffer is {got}"
                )
            }
            Self::Corruption => write!(f, "frame corruption detected (magic mismatch)"),
            Self::BufferSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "segment ring size mismatch: expected {expected}, segment has {actual}"
                )
            }
        }
    }
}

impl std::error::Error for ShmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SegmentCreate(e) | Self::SegmentOpen(e) | Self::Mmap(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for SHM operations
pub type Result<T> = std::result::Result<T, ShmError>;

/// Derive the deterministic segment name for a (domain, topic) pair.
///
/// Format: `/tiny_dds_<domain>_<topic>`, with every character outside
/// `[A-Za-z0-9_/]` replaced by `_`. This mapping is a cross-process
/// contract: any process derives the same name independently.
#[must_use]
pub fn segment_name(domain_id: DomainId, topic: &str) -> String {
    let raw = format!("{SEGMENT_NAME_PREFIX}{domain_id}_{topic}");
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '/' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A mapped per-topic segment plus ownership bookkeeping.
struct TopicSegment {
    segment: ShmSegment,
    /// Whether this transport created the OS object (and must unlink it)
    created: bool,
}

impl TopicSegment {
    fn ring(&self) -> Ring {
        // SAFETY: the segment was mapped with ring_segment_size(buffer)
        // bytes and starts with a RingHeader (initialized by the creator
        // or zero-filled by the kernel, both valid).
        unsafe { Ring::from_base(self.segment.as_ptr()) }
    }
}

/// Shared-memory transport: one ring-buffer segment per topic.
///
/// A coarse mutex serializes same-process access to the topic map and
/// the rings behind it; cross-process ordering is carried entirely by
/// the ring index atomics.
pub struct SharedMemoryTransport {
    domain_id: DomainId,
    participant_name: String,
    buffer_size: u32,
    max_message_size: u32,
    segments: Mutex<HashMap<String, TopicSegment>>,
}

impl SharedMemoryTransport {
    /// Create a transport for `domain_id`.
    ///
    /// `buffer_size` is the per-topic ring data size; `max_message_size`
    /// bounds a single frame (header + payload). No OS work happens
    /// until a topic is advertised or subscribed.
    #[must_use]
    pub fn new(
        domain_id: DomainId,
        participant_name: &str,
        buffer_size: u32,
        max_message_size: u32,
    ) -> Self {
        Self {
            domain_id,
            participant_name: participant_name.to_string(),
            buffer_size,
            max_message_size,
            segments: Mutex::new(HashMap::new()),
        }
    }

    /// Domain this transport serves.
    #[must_use]
    pub fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    /// Advertise a topic: create or open its segment and initialize the
    /// ring header. Idempotent per transport instance.
    pub fn advertise(&self, topic: &str) -> Result<()> {
        let mut segments = self.segments.lock();
        if segments.contains_key(topic) {
            return Ok(());
        }

        let entry = self.map_topic(topic)?;
        // The advertising side owns the init: write_index = read_index = 0
        // and the sizing fields. Racing initializers write identical
        // values, so the first party through wins harmlessly.
        entry.ring().init(self.buffer_size, self.max_message_size);
        log::debug!(
            "[SHM] advertise domain={} topic={} segment={} buffer_size={}",
            self.domain_id,
            topic,
            entry.segment.name(),
            self.buffer_size
        );
        segments.insert(topic.to_string(), entry);
        Ok(())
    }

    /// Subscribe to a topic: create or open its segment *without*
    /// reinitializing the header (a freshly created object is zero-filled
    /// by the kernel, which is a valid empty ring). Idempotent.
    pub fn subscribe(&self, topic: &str) -> Result<()> {
        let mut segments = self.segments.lock();
        if segments.contains_key(topic) {
            return Ok(());
        }

        let entry = self.map_topic(topic)?;
        if !entry.created {
            // Defensive: a peer advertised with different sizing; our
            // mapping would not cover its data region.
            let actual = entry.ring().header().buffer_size;
            if actual != 0 && actual != self.buffer_size {
                return Err(ShmError::BufferSizeMismatch {
                    expected: self.buffer_size,
                    actual,
                });
            }
        }
        log::debug!(
            "[SHM] subscribe domain={} topic={} segment={} created={}",
            self.domain_id,
            topic,
            entry.segment.name(),
            entry.created
        );
        segments.insert(topic.to_string(), entry);
        Ok(())
    }

    /// Send one payload on a topic.
    ///
    /// Rejects with nothing written when the frame exceeds the maximum
    /// message size or the ring is full.
    pub fn send(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let segments = self.segments.lock();
        let entry = segments
            .get(topic)
            .ok_or_else(|| ShmError::TopicNotFound(topic.to_string()))?;
        entry.ring().push(topic, &self.participant_name, payload)
    }

    /// Receive one payload from a topic into `buf`.
    ///
    /// `Ok(None)` means no data (or a foreign/padding frame was skipped);
    /// a too-small `buf` preserves the frame for a retry.
    pub fn receive(&self, topic: &str, buf: &mut [u8]) -> Result<Option<usize>> {
        let segments = self.segments.lock();
        let entry = segments
            .get(topic)
            .ok_or_else(|| ShmError::TopicNotFound(topic.to_string()))?;
        entry.ring().pop(topic, buf)
    }

    fn map_topic(&self, topic: &str) -> Result<TopicSegment> {
        let name = segment_name(self.domain_id, topic);
        let total = ring_segment_size(self.buffer_size);
        let (segment, created) = ShmSegment::open_or_create(&name, total)?;
        Ok(TopicSegment { segment, created })
    }
}

impl Drop for SharedMemoryTransport {
    fn drop(&mut self) {
        // Unlink exactly the segments this transport created; peers'
        // mappings stay valid until they unmap (POSIX semantics), and
        // segments created by other processes are left intact.
        let segments = self.segments.get_mut();
        for (topic, entry) in segments.iter() {
            if entry.created {
                if let Err(e) = ShmSegment::unlink(entry.segment.name()) {
                    log::warn!(
                        "[SHM] failed to unlink segment {} (topic {}): {}",
                        entry.segment.name(),
                        topic,
                        e
                    );
                } else {
                    log::debug!(
                        "[SHM] unlinked segment {} (topic {})",
                        entry.segment.name(),
                        topic
                    );
                }
            }
        }
    }
}
