// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide transport manager.
//!
//! One logical instance reachable from every component in the process
//! (`TransportManager::global()`), holding two per-domain maps - UDP and
//! shared memory - so the same domain id can exist in both without the
//! kinds shadowing each other.
//!
//! # Lifecycle
//!
//! The maps hold `Weak<Transport>`: participants keep the strong
//! references, so when the last participant of a (domain, kind) goes
//! away the transport drops and releases its OS resources (segments
//! unlinked, sockets closed). A later `create_transport` for the same
//! key simply builds a fresh instance over the stale entry.
//!
//! # Locking
//!
//! Map lookups clone the `Arc` and release the manager lock before
//! calling into the located transport, which holds its own lock.

use crate::dds::{DomainId, Error, Result};
use crate::transport::{Transport, TransportConfig, TransportKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// Registry of live transports, keyed by domain id per kind.
pub struct TransportManager {
    udp: Mutex<HashMap<DomainId, Weak<Transport>>>,
    shm: Mutex<HashMap<DomainId, Weak<Transport>>>,
}

impl TransportManager {
    fn new() -> Self {
        Self {
            udp: Mutex::new(HashMap::new()),
            shm: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide instance (created on first access; all OS work is
    /// deferred to method bodies, so there is no initialization-order
    /// hazard).
    pub fn global() -> &'static TransportManager {
        static MANAGER: OnceLock<TransportManager> = OnceLock::new();
        MANAGER.get_or_init(TransportManager::new)
    }

    fn map_for(&self, kind: TransportKind) -> &Mutex<HashMap<DomainId, Weak<Transport>>> {
        match kind {
            TransportKind::Udp => &self.udp,
            TransportKind::SharedMemory => &self.shm,
        }
    }

    /// Get or create the transport for `(domain_id, kind)`.
    ///
    /// Idempotent: a live transport is returned as-is; a dead or missing
    /// entry is (re)built with `config`. The caller must retain the
    /// returned `Arc` - the manager itself only holds a weak reference.
    pub fn create_transport(
        &self,
        domain_id: DomainId,
        participant_name: &str,
        config: &TransportConfig,
        kind: TransportKind,
    ) -> Arc<Transport> {
        let mut map = match self.map_for(kind).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = map.get(&domain_id).and_then(Weak::upgrade) {
            return existing;
        }

        let transport = Arc::new(Transport::create(domain_id, participant_name, config, kind));
        map.insert(domain_id, Arc::downgrade(&transport));
        log::debug!(
            "[Manager] created {} transport for domain {}",
            kind,
            domain_id
        );
        transport
    }

    /// Look up the live transport for `(domain_id, kind)`.
    pub fn lookup(&self, domain_id: DomainId, kind: TransportKind) -> Option<Arc<Transport>> {
        let map = match self.map_for(kind).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(&domain_id).and_then(Weak::upgrade)
    }

    fn get(&self, domain_id: DomainId, kind: TransportKind) -> Result<Arc<Transport>> {
        self.lookup(domain_id, kind).ok_or_else(|| {
            log::error!("[Manager] no {} transport for domain {}", kind, domain_id);
            Error::TransportNotFound { domain_id, kind }
        })
    }

    /// Forward an advertise to the domain's transport of `kind`.
    pub fn advertise(&self, domain_id: DomainId, topic: &str, kind: TransportKind) -> Result<()> {
        self.get(domain_id, kind)?.advertise(topic)
    }

    /// Forward a subscribe to the domain's transport of `kind`.
    pub fn subscribe(&self, domain_id: DomainId, topic: &str, kind: TransportKind) -> Result<()> {
        self.get(domain_id, kind)?.subscribe(topic)
    }

    /// Forward a send to the domain's transport of `kind`.
    pub fn send(
        &self,
        domain_id: DomainId,
        topic: &str,
        payload: &[u8],
        kind: TransportKind,
    ) -> Result<()> {
        self.get(domain_id, kind)?.send(topic, payload)
    }

    /// Forward a receive to the domain's transport of `kind`.
    pub fn receive(
        &self,
        domain_id: DomainId,
        topic: &str,
        buf: &mut [u8],
        kind: TransportKind,
    ) -> Result<Option<usize>> {
        self.get(domain_id, kind)?.receive(topic, buf)
    }
}
