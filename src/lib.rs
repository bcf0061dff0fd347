// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # tinydds - lightweight publish/subscribe middleware
//!
//! A DDS-inspired pub/sub core for in-process and inter-process
//! communication: applications create a [`Participant`] scoped to a
//! numeric domain, declare typed [`Topic`]s, and attach [`DataWriter`]s
//! and [`DataReader`]s that exchange opaque byte payloads over the
//! domain's transport.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                      Application Layer                       |
//! |  Participant -> Publisher/Subscriber -> DataWriter/DataReader|
//! +--------------------------------------------------------------+
//! |                     Dispatch & Delivery                      |
//! |  write -> TransportManager.send | poll / callback delivery   |
//! +--------------------------------------------------------------+
//! |                       Transport Layer                        |
//! |  Shared-memory ring buffers  |  Broadcast UDP datagrams      |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tinydds::{Participant, TransportKind};
//!
//! let participant = Participant::create(42, "sensor_node");
//! participant.set_transport_kind(TransportKind::SharedMemory)?;
//!
//! let topic = participant.create_topic("temperature", "SensorReading")?;
//!
//! let publisher = participant.create_publisher();
//! let writer = publisher.create_writer(&topic)?;
//! writer.write(&[0x01, 0x02, 0x03, 0x04])?;
//!
//! let subscriber = participant.create_subscriber();
//! let reader = subscriber.create_reader(&topic)?;
//! let mut buf = [0u8; 64];
//! let mut info = tinydds::SampleInfo::default();
//! if let Some(n) = reader.read(&mut buf, &mut info)? {
//!     println!("received {n} bytes");
//! }
//! # Ok::<(), tinydds::Error>(())
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Participant`] | Entry point to a domain, factory for all entities |
//! | [`DataWriter`] | Publishes byte payloads to a topic |
//! | [`DataReader`] | Polls (or receives via callback) payloads from a topic |
//! | [`Topic`] | Named channel with an associated type name |
//! | [`TransportManager`] | Process-wide per-domain transport registry |
//!
//! ## Delivery Model
//!
//! Best-effort and volatile: a full ring or a lost datagram is reported,
//! never retransmitted. Shared memory preserves single-writer FIFO
//! order; UDP does not. All public operations are non-blocking.
//!
//! ## Modules Overview
//!
//! - [`dds`] - entity graph (start here)
//! - [`transport`] - shared-memory and UDP transports, manager
//! - [`config`] - constants and the declarative YAML loader

/// Global constants and the declarative YAML configuration loader.
pub mod config;
/// Core entity graph (Participant, Publisher, Subscriber, endpoints).
pub mod dds;
/// Transport layer (shared memory, UDP, per-domain manager).
pub mod transport;

pub use config::{Config, ConfigLoader};
pub use dds::{
    DataReader, DataWriter, DomainId, Durability, Error, Participant, PublicationMatchedStatus,
    Publisher, QoS, Reliability, Result, SampleInfo, Subscriber, SubscriptionMatchedStatus, Topic,
};
pub use transport::{TransportConfig, TransportKind, TransportManager};

/// tinydds version string.
pub const VERSION: &str = "0.2.0";
