// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS Publisher entity - creates and manages DataWriter instances.
//!
//! Publisher and Subscriber are intentionally symmetric types rather
//! than one generic entity: users expect the DDS pairing, and separate
//! types keep writers and readers from mixing.

use super::{DataWriter, Error, QoS, Result, Topic};
use crate::transport::TransportManager;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Factory for [`DataWriter`]s, created by a participant.
///
/// Holds a non-owning reference back to its participant and a map from
/// topic name to the writer created for that topic.
pub struct Publisher {
    participant: Weak<super::Participant>,
    qos: QoS,
    writers: Mutex<HashMap<String, Arc<DataWriter>>>,
}

impl Publisher {
    pub(crate) fn new(participant: Weak<super::Participant>, qos: QoS) -> Arc<Self> {
        Arc::new(Self {
            participant,
            qos,
            writers: Mutex::new(HashMap::new()),
        })
    }

    /// QoS policies carried by this publisher.
    #[must_use]
    pub fn qos(&self) -> &QoS {
        &self.qos
    }

    /// Create a writer bound to `topic`.
    ///
    /// Construction immediately ensures the participant's transport
    /// exists for the domain and advertises the topic on it, so the
    /// first `write` finds everything in place.
    pub fn create_writer(&self, topic: &Arc<Topic>) -> Result<Arc<DataWriter>> {
        let participant = self.participant.upgrade().ok_or(Error::ParticipantGone)?;
        let kind = participant.transport_kind();
        let config = participant.transport_config();
        let domain_id = participant.domain_id();

        let manager = TransportManager::global();
        let transport = manager.create_transport(domain_id, participant.name(), &config, kind);
        participant.retain_transport(transport);
        manager.advertise(domain_id, topic.name(), kind)?;

        log::debug!(
            "[Publisher] writer created domain={} topic={} kind={}",
            domain_id,
            topic.name(),
            kind
        );

        let writer = DataWriter::new(Arc::clone(topic), domain_id, kind, self.qos);
        self.writers
            .lock()
            .insert(topic.name().to_string(), Arc::clone(&writer));
        Ok(writer)
    }

    /// Look up the writer previously created for a topic name.
    #[must_use]
    pub fn lookup_writer(&self, topic_name: &str) -> Option<Arc<DataWriter>> {
        self.writers.lock().get(topic_name).cloned()
    }
}
