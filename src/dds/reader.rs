// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DataReader: the consuming endpoint for one topic.
//!
//! Readers are polled: `read`/`take` return immediately with whatever
//! the transport holds. Alternatively a callback can be installed, in
//! which case the owning subscriber's delivery task polls on the
//! reader's behalf and invokes the callback outside any lock.

use super::{QoS, Result, SampleInfo, SubscriptionMatchedStatus, Topic};
use crate::dds::DomainId;
use crate::transport::{TransportKind, TransportManager};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Callback receiving `(payload, sample info)`.
pub type DataReceivedCallback = dyn Fn(&[u8], &SampleInfo) + Send + Sync;

/// Callback receiving `(domain, topic, payload)` for routing-aware
/// consumers.
pub type RoutedDataCallback = dyn Fn(DomainId, &str, &[u8]) + Send + Sync;

#[derive(Default)]
struct Callbacks {
    on_data: Option<Arc<DataReceivedCallback>>,
    on_routed: Option<Arc<RoutedDataCallback>>,
}

/// Reads byte payloads from one topic.
pub struct DataReader {
    topic: Arc<Topic>,
    domain_id: DomainId,
    kind: TransportKind,
    qos: QoS,
    /// Scratch sizing for callback delivery (one full frame payload)
    max_message_size: u32,
    subscriber: Weak<super::Subscriber>,
    callbacks: Mutex<Callbacks>,
    status: Mutex<SubscriptionMatchedStatus>,
}

impl DataReader {
    pub(crate) fn new(
        topic: Arc<Topic>,
        domain_id: DomainId,
        kind: TransportKind,
        qos: QoS,
        max_message_size: u32,
        subscriber: Weak<super::Subscriber>,
    ) -> Arc<Self> {
        Arc::new(Self {
            topic,
            domain_id,
            kind,
            qos,
            max_message_size,
            subscriber,
            callbacks: Mutex::new(Callbacks::default()),
            status: Mutex::new(SubscriptionMatchedStatus::default()),
        })
    }

    /// Read the next pending payload into `buf`, without blocking.
    ///
    /// `Ok(Some(n))` copies `n` bytes and marks `info.valid_data`;
    /// `Ok(None)` means nothing is pending. A shared-memory frame larger
    /// than `buf` fails with `BufferTooSmall` and stays available for a
    /// retry.
    pub fn read(&self, buf: &mut [u8], info: &mut SampleInfo) -> Result<Option<usize>> {
        info.valid_data = false;
        let received =
            TransportManager::global().receive(self.domain_id, self.topic.name(), buf, self.kind)?;
        if let Some(n) = received {
            info.valid_data = true;
            return Ok(Some(n));
        }
        Ok(None)
    }

    /// Take the next pending payload.
    ///
    /// Identical to [`read`](Self::read) at this transport layer: both
    /// consume the message, so a returned payload is never visible to a
    /// later call on this reader.
    pub fn take(&self, buf: &mut [u8], info: &mut SampleInfo) -> Result<Option<usize>> {
        self.read(buf, info)
    }

    /// Install the simple `(payload, info)` callback and start the
    /// subscriber's delivery task.
    pub fn set_data_received_callback<F>(&self, callback: F)
    where
        F: Fn(&[u8], &SampleInfo) + Send + Sync + 'static,
    {
        self.callbacks.lock().on_data = Some(Arc::new(callback));
        if let Some(subscriber) = self.subscriber.upgrade() {
            subscriber.ensure_delivery_task();
        }
    }

    /// Install the routed `(domain, topic, payload)` callback and start
    /// the subscriber's delivery task.
    pub fn set_data_callback<F>(&self, callback: F)
    where
        F: Fn(DomainId, &str, &[u8]) + Send + Sync + 'static,
    {
        self.callbacks.lock().on_routed = Some(Arc::new(callback));
        if let Some(subscriber) = self.subscriber.upgrade() {
            subscriber.ensure_delivery_task();
        }
    }

    /// Poll the transport once on behalf of the delivery task, invoking
    /// callbacks for every pending message.
    ///
    /// The callback references are cloned out of the lock first, so user
    /// code runs with no reader or subscriber lock held and may call
    /// back into the API freely.
    pub(crate) fn poll_deliver(&self, scratch: &mut Vec<u8>) {
        let (on_data, on_routed) = {
            let callbacks = self.callbacks.lock();
            (callbacks.on_data.clone(), callbacks.on_routed.clone())
        };
        if on_data.is_none() && on_routed.is_none() {
            return;
        }

        scratch.resize(self.max_message_size as usize, 0);
        loop {
            match TransportManager::global().receive(
                self.domain_id,
                self.topic.name(),
                scratch,
                self.kind,
            ) {
                Ok(Some(n)) => {
                    let info = SampleInfo { valid_data: true };
                    if let Some(ref callback) = on_data {
                        callback(&scratch[..n], &info);
                    }
                    if let Some(ref callback) = on_routed {
                        callback(self.domain_id, self.topic.name(), &scratch[..n]);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::debug!(
                        "[Reader] delivery poll failed domain={} topic={}: {}",
                        self.domain_id,
                        self.topic.name(),
                        e
                    );
                    break;
                }
            }
        }
    }

    /// The topic this reader is bound to.
    #[must_use]
    pub fn topic(&self) -> &Arc<Topic> {
        &self.topic
    }

    /// QoS policies carried by this reader.
    #[must_use]
    pub fn qos(&self) -> &QoS {
        &self.qos
    }

    /// Endpoint-matching counters (carried for API compatibility).
    #[must_use]
    pub fn subscription_matched_status(&self) -> SubscriptionMatchedStatus {
        *self.status.lock()
    }
}
