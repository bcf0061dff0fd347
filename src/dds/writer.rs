// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DataWriter: the producing endpoint for one topic.

use super::{PublicationMatchedStatus, QoS, Result, Topic};
use crate::dds::DomainId;
use crate::transport::{TransportKind, TransportManager};
use parking_lot::Mutex;
use std::sync::Arc;

/// Writes byte payloads to one topic.
///
/// The domain and transport kind are captured at creation (the kind is
/// frozen on the participant by then), so a write is a straight lookup
/// and send through the transport manager.
pub struct DataWriter {
    topic: Arc<Topic>,
    domain_id: DomainId,
    kind: TransportKind,
    qos: QoS,
    status: Mutex<PublicationMatchedStatus>,
}

impl DataWriter {
    pub(crate) fn new(
        topic: Arc<Topic>,
        domain_id: DomainId,
        kind: TransportKind,
        qos: QoS,
    ) -> Arc<Self> {
        Arc::new(Self {
            topic,
            domain_id,
            kind,
            qos,
            status: Mutex::new(PublicationMatchedStatus::default()),
        })
    }

    /// Publish one payload on the bound topic.
    ///
    /// Never blocks; a full shared-memory ring or a failed socket send
    /// surfaces as an error and nothing is written.
    pub fn write(&self, payload: &[u8]) -> Result<()> {
        TransportManager::global().send(self.domain_id, self.topic.name(), payload, self.kind)
    }

    /// The topic this writer is bound to.
    #[must_use]
    pub fn topic(&self) -> &Arc<Topic> {
        &self.topic
    }

    /// QoS policies carried by this writer.
    #[must_use]
    pub fn qos(&self) -> &QoS {
        &self.qos
    }

    /// Endpoint-matching counters (carried for API compatibility).
    #[must_use]
    pub fn publication_matched_status(&self) -> PublicationMatchedStatus {
        *self.status.lock()
    }
}
