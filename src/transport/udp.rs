// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP transport for host-to-host datagram delivery.
//!
//! One non-blocking datagram socket per topic and role. Writers send to
//! the broadcast address at a port derived deterministically from
//! (domain, topic); readers bind that port on all interfaces. Delivery
//! is best-effort: datagrams may be lost, duplicated, or reordered, and
//! nothing is retransmitted.

use crate::dds::{DomainId, Error, Result};
use crate::transport::ports::derive_topic_port;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

/// Which side of the topic a socket serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketRole {
    /// Unbound send-only socket with broadcast enabled
    Writer,
    /// Socket bound to the derived port on all interfaces
    Reader,
}

/// Per-socket bookkeeping: the socket, its derived port, the local bind
/// address, and the role it plays.
struct UdpEndpoint {
    socket: UdpSocket,
    port: u16,
    #[allow(dead_code)]
    bind_addr: Ipv4Addr,
    #[allow(dead_code)]
    role: SocketRole,
}

/// Socket state for one topic.
///
/// The writer and reader sides are tracked separately so a process that
/// both publishes and subscribes a topic keeps a bound receive socket
/// alongside its send socket.
#[derive(Default)]
struct TopicSockets {
    writer: Option<UdpEndpoint>,
    reader: Option<UdpEndpoint>,
}

/// UDP transport: per-topic broadcast sockets for one domain.
pub struct UdpTransport {
    domain_id: DomainId,
    #[allow(dead_code)]
    participant_name: String,
    /// Datagram destination; broadcast unless overridden by configuration
    dest_addr: Ipv4Addr,
    /// Fixed port overriding the per-topic derivation (configuration)
    port_override: Option<u16>,
    sockets: Mutex<HashMap<String, TopicSockets>>,
}

impl UdpTransport {
    /// Create a transport for `domain_id`. No sockets are opened until a
    /// topic is advertised or subscribed.
    #[must_use]
    pub fn new(domain_id: DomainId, participant_name: &str) -> Self {
        Self::with_destination(domain_id, participant_name, Ipv4Addr::BROADCAST, None)
    }

    /// Create a transport with a custom destination address and/or fixed
    /// port (from the declarative configuration).
    #[must_use]
    pub fn with_destination(
        domain_id: DomainId,
        participant_name: &str,
        dest_addr: Ipv4Addr,
        port_override: Option<u16>,
    ) -> Self {
        Self {
            domain_id,
            participant_name: participant_name.to_string(),
            dest_addr,
            port_override,
            sockets: Mutex::new(HashMap::new()),
        }
    }

    /// Domain this transport serves.
    #[must_use]
    pub fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    fn topic_port(&self, topic: &str) -> u16 {
        self.port_override
            .unwrap_or_else(|| derive_topic_port(self.domain_id, topic))
    }

    /// Advertise a topic: create the send-side socket. Idempotent.
    ///
    /// The socket is not bound to a local port (it is only used for
    /// `send_to`) and has broadcast enabled.
    pub fn advertise(&self, topic: &str) -> Result<()> {
        let mut sockets = self.sockets.lock();
        let entry = sockets.entry(topic.to_string()).or_default();
        if entry.writer.is_some() {
            return Ok(());
        }

        let port = self.topic_port(topic);
        let socket = new_datagram_socket()?;
        socket.set_broadcast(true).map_err(Error::Io)?;
        let socket: UdpSocket = socket.into();

        log::debug!(
            "[UDP] advertise domain={} topic={} port={} dest={}",
            self.domain_id,
            topic,
            port,
            self.dest_addr
        );
        entry.writer = Some(UdpEndpoint {
            socket,
            port,
            bind_addr: Ipv4Addr::UNSPECIFIED,
            role: SocketRole::Writer,
        });
        Ok(())
    }

    /// Subscribe to a topic: create the receive-side socket bound to the
    /// derived port on all interfaces. Idempotent.
    pub fn subscribe(&self, topic: &str) -> Result<()> {
        let mut sockets = self.sockets.lock();
        let entry = sockets.entry(topic.to_string()).or_default();
        if entry.reader.is_some() {
            return Ok(());
        }

        let port = self.topic_port(topic);
        let socket = new_datagram_socket()?;
        socket.set_reuse_address(true).map_err(Error::Io)?;
        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
        socket
            .bind(&SocketAddr::V4(bind_addr).into())
            .map_err(|e| {
                log::error!(
                    "[UDP] bind failed domain={} topic={} port={}: {}",
                    self.domain_id,
                    topic,
                    port,
                    e
                );
                Error::Io(e)
            })?;
        let socket: UdpSocket = socket.into();

        log::debug!(
            "[UDP] subscribe domain={} topic={} port={}",
            self.domain_id,
            topic,
            port
        );
        entry.reader = Some(UdpEndpoint {
            socket,
            port,
            bind_addr: Ipv4Addr::UNSPECIFIED,
            role: SocketRole::Reader,
        });
        Ok(())
    }

    /// Send one datagram on a topic to the destination address at the
    /// topic's derived port.
    pub fn send(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let sockets = self.sockets.lock();
        let endpoint = sockets
            .get(topic)
            .and_then(|e| e.writer.as_ref())
            .ok_or_else(|| Error::TopicNotFound(topic.to_string()))?;

        let dest = SocketAddrV4::new(self.dest_addr, endpoint.port);
        match endpoint.socket.send_to(payload, dest) {
            Ok(sent) => {
                if sent != payload.len() {
                    log::warn!(
                        "[UDP] short send topic={} sent={} len={}",
                        topic,
                        sent,
                        payload.len()
                    );
                }
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "[UDP] send failed domain={} topic={} dest={}: {}",
                    self.domain_id,
                    topic,
                    dest,
                    e
                );
                Err(Error::Io(e))
            }
        }
    }

    /// Receive one datagram from a topic into `buf`, without blocking.
    ///
    /// `Ok(None)` when no datagram is pending (would-block is not an
    /// error). A datagram larger than `buf` is truncated by the kernel,
    /// matching `recvfrom` semantics.
    pub fn receive(&self, topic: &str, buf: &mut [u8]) -> Result<Option<usize>> {
        let sockets = self.sockets.lock();
        let endpoint = sockets
            .get(topic)
            .and_then(|e| e.reader.as_ref())
            .ok_or_else(|| Error::TopicNotFound(topic.to_string()))?;

        match endpoint.socket.recv_from(buf) {
            Ok((received, _src)) => Ok(Some(received)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => {
                log::error!(
                    "[UDP] receive failed domain={} topic={}: {}",
                    self.domain_id,
                    topic,
                    e
                );
                Err(Error::Io(e))
            }
        }
    }
}

/// Create a non-blocking IPv4 datagram socket.
fn new_datagram_socket() -> Result<Socket> {
    let socket =
        Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(Error::Io)?;
    socket.set_nonblocking(true).map_err(Error::Io)?;
    Ok(socket)
}
