// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain participant: the root of an entity tree within a domain.
//!
//! A participant owns its topics, publishers, and subscribers, and pins
//! the transports it uses: the transport manager only holds weak
//! references, so the last participant of a (domain, kind) releases the
//! OS resources (segments unlinked, sockets closed) when it drops.

use super::{Error, Publisher, Result, Subscriber, Topic};
use crate::dds::DomainId;
use crate::transport::{Transport, TransportConfig, TransportKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct State {
    transport_kind: TransportKind,
    transport_config: TransportConfig,
    topics: HashMap<String, Arc<Topic>>,
    publishers: Vec<Arc<Publisher>>,
    subscribers: Vec<Arc<Subscriber>>,
    /// Strong references pinning the transports this participant uses.
    /// Declared last so subscriber delivery threads wind down before the
    /// transports they poll are released.
    transports: Vec<Arc<Transport>>,
}

impl State {
    fn has_children(&self) -> bool {
        !self.publishers.is_empty() || !self.subscribers.is_empty()
    }
}

/// Entry point to a domain: factory for topics, publishers, and
/// subscribers.
///
/// Reference-counted and shareable across threads. The participant name
/// is opaque to routing (it travels in shared-memory frame headers as
/// the sender); uniqueness is the application's business.
pub struct Participant {
    domain_id: DomainId,
    name: String,
    state: Mutex<State>,
}

impl Participant {
    /// Create a participant in `domain_id`.
    ///
    /// Defaults: UDP transport, 1 MiB ring / 64 KiB max message for
    /// shared memory, no children.
    #[must_use]
    pub fn create(domain_id: DomainId, name: &str) -> Arc<Self> {
        log::debug!("[Participant] create domain={} name={}", domain_id, name);
        Arc::new(Self {
            domain_id,
            name: name.to_string(),
            state: Mutex::new(State {
                transport_kind: TransportKind::default(),
                transport_config: TransportConfig::default(),
                topics: HashMap::new(),
                publishers: Vec::new(),
                subscribers: Vec::new(),
                transports: Vec::new(),
            }),
        })
    }

    /// Domain this participant lives in.
    #[must_use]
    pub fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    /// Participant name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transport kind used by writers and readers of this participant.
    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        self.state.lock().transport_kind
    }

    /// Select the transport kind.
    ///
    /// Only allowed while the participant has no publishers and no
    /// subscribers; the kind freezes with the first child so every
    /// writer and reader of this participant agrees on it.
    pub fn set_transport_kind(&self, kind: TransportKind) -> Result<()> {
        let mut state = self.state.lock();
        if state.has_children() {
            return Err(Error::InvalidState(format!(
                "cannot change transport kind to {kind}: participant '{}' already has children",
                self.name
            )));
        }
        state.transport_kind = kind;
        Ok(())
    }

    /// Transport sizing/addressing applied when transports are built.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        self.state.lock().transport_config
    }

    /// Override transport sizing/addressing.
    ///
    /// Frozen together with the kind once children exist.
    pub fn set_transport_config(&self, config: TransportConfig) -> Result<()> {
        let mut state = self.state.lock();
        if state.has_children() {
            return Err(Error::InvalidState(format!(
                "cannot change transport config: participant '{}' already has children",
                self.name
            )));
        }
        state.transport_config = config;
        Ok(())
    }

    /// Create a topic, or return the existing one.
    ///
    /// Within one participant a topic name is bound to exactly one type
    /// name: re-creating with the same type returns the same `Arc`;
    /// re-creating with a different type fails.
    pub fn create_topic(self: &Arc<Self>, name: &str, type_name: &str) -> Result<Arc<Topic>> {
        let mut state = self.state.lock();
        if let Some(existing) = state.topics.get(name) {
            if existing.type_name() == type_name {
                return Ok(Arc::clone(existing));
            }
            return Err(Error::TypeMismatch {
                topic: name.to_string(),
                existing: existing.type_name().to_string(),
                requested: type_name.to_string(),
            });
        }

        let topic = Arc::new(Topic::new(name, type_name, Arc::downgrade(self)));
        state.topics.insert(name.to_string(), Arc::clone(&topic));
        Ok(topic)
    }

    /// Look up a topic previously created on this participant.
    #[must_use]
    pub fn lookup_topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.state.lock().topics.get(name).cloned()
    }

    /// Create a publisher with default QoS.
    #[must_use]
    pub fn create_publisher(self: &Arc<Self>) -> Arc<Publisher> {
        self.create_publisher_with_qos(super::QoS::default())
    }

    /// Create a publisher carrying `qos`.
    #[must_use]
    pub fn create_publisher_with_qos(self: &Arc<Self>, qos: super::QoS) -> Arc<Publisher> {
        let publisher = Publisher::new(Arc::downgrade(self), qos);
        self.state.lock().publishers.push(Arc::clone(&publisher));
        publisher
    }

    /// Create a subscriber with default QoS.
    #[must_use]
    pub fn create_subscriber(self: &Arc<Self>) -> Arc<Subscriber> {
        self.create_subscriber_with_qos(super::QoS::default())
    }

    /// Create a subscriber carrying `qos`.
    #[must_use]
    pub fn create_subscriber_with_qos(self: &Arc<Self>, qos: super::QoS) -> Arc<Subscriber> {
        let subscriber = Subscriber::new(Arc::downgrade(self), qos);
        self.state.lock().subscribers.push(Arc::clone(&subscriber));
        subscriber
    }

    /// Pin a transport for the lifetime of this participant.
    pub(crate) fn retain_transport(&self, transport: Arc<Transport>) {
        let mut state = self.state.lock();
        if !state.transports.iter().any(|t| Arc::ptr_eq(t, &transport)) {
            state.transports.push(transport);
        }
    }
}
