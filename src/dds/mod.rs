// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDS Core API
//!
//! The entity graph binding user-level operations to transport calls.
//!
//! ## Entity Hierarchy
//!
//! ```text
//! Participant (domain, name, transport kind)
//! +-- Publisher
//! |   +-- DataWriter  ------> Topic (name, type name)
//! +-- Subscriber
//!     +-- DataReader  <------ Topic
//! ```
//!
//! A [`Participant`] scopes everything to a numeric domain. Writers and
//! readers exchange opaque byte payloads over the participant's chosen
//! transport; routing is by topic name alone, the type name is carried
//! only as a matching discipline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tinydds::{Participant, TransportKind};
//!
//! let participant = Participant::create(0, "example");
//! participant.set_transport_kind(TransportKind::SharedMemory)?;
//!
//! let topic = participant.create_topic("sensors", "SensorReading")?;
//! let publisher = participant.create_publisher();
//! let writer = publisher.create_writer(&topic)?;
//! writer.write(b"payload")?;
//! # Ok::<(), tinydds::Error>(())
//! ```

mod participant;
mod publisher;
/// QoS policy definitions.
pub mod qos;
mod reader;
mod subscriber;
mod topic;
mod writer;

pub use participant::Participant;
pub use publisher::Publisher;
pub use qos::{Durability, QoS, Reliability};
pub use reader::DataReader;
pub use subscriber::Subscriber;
pub use topic::Topic;
pub use writer::DataWriter;

use crate::transport::shm::ShmError;
use crate::transport::TransportKind;

/// Numeric namespace isolating participants; peers in different domains
/// never exchange data.
pub type DomainId = u32;

/// Errors returned by tinydds operations.
///
/// All failures are local-recovery: no operation leaves shared state
/// half-mutated, and the caller decides whether to retry or give up.
#[derive(Debug)]
pub enum Error {
    /// Operation not allowed in the entity's current state (e.g. setting
    /// the transport kind after children exist).
    InvalidState(String),

    /// A topic name is already bound to a different type name.
    TypeMismatch {
        /// Topic whose creation was attempted
        topic: String,
        /// Type name the topic is already bound to
        existing: String,
        /// Type name the caller requested
        requested: String,
    },

    /// The parent participant no longer exists.
    ParticipantGone,

    /// No transport constructed for the requested domain and kind.
    TransportNotFound {
        /// Requested domain
        domain_id: DomainId,
        /// Requested transport kind
        kind: TransportKind,
    },

    /// No per-topic state (socket or segment) for the requested topic.
    TopicNotFound(String),

    /// Shared-memory transport failure.
    Shm(ShmError),

    /// Socket or other OS-level I/O failure.
    Io(std::io::Error),

    /// Declarative configuration is malformed or inconsistent.
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Error::TypeMismatch {
                topic,
                existing,
                requested,
            } => write!(
                f,
                "topic '{topic}' already bound to type '{existing}' (requested '{requested}')"
            ),
            Error::ParticipantGone => write!(f, "parent participant no longer exists"),
            Error::TransportNotFound { domain_id, kind } => {
                write!(f, "no {kind} transport for domain {domain_id}")
            }
            Error::TopicNotFound(topic) => write!(f, "topic not found: {topic}"),
            Error::Shm(e) => write!(f, "shared memory: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Shm(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShmError> for Error {
    fn from(e: ShmError) -> Self {
        Error::Shm(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for API results using the public [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Metadata attached to a received sample.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleInfo {
    /// Whether the sample carries valid application data
    pub valid_data: bool,
}

/// Writer-side endpoint matching counters.
///
/// Matching discovery is not part of this transport layer; the counters
/// are carried for API compatibility and stay at their defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublicationMatchedStatus {
    /// Cumulative number of matched readers
    pub total_count: i32,
    /// Change in `total_count` since last read
    pub total_count_change: i32,
    /// Currently matched readers
    pub current_count: i32,
    /// Change in `current_count` since last read
    pub current_count_change: i32,
}

/// Reader-side endpoint matching counters (see
/// [`PublicationMatchedStatus`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionMatchedStatus {
    /// Cumulative number of matched writers
    pub total_count: i32,
    /// Change in `total_count` since last read
    pub total_count_change: i32,
    /// Currently matched writers
    pub current_count: i32,
    /// Change in `current_count` since last read
    pub current_count_change: i32,
}
