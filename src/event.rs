//! Typed notifications emitted by the client.

use std::net::SocketAddr;

use crate::device::Device;
use crate::packet::Packet;

/// Everything the client reports to subscribers.
///
/// Delivered over a broadcast channel; slow subscribers that lag simply miss
/// older events.
#[derive(Debug, Clone)]
pub enum Event {
    /// The socket is bound and the client is operational.
    Listening { addr: SocketAddr },
    /// A previously unknown device answered a discovery probe.
    Discovered(Device),
    /// A device marked offline answered again.
    Online(Device),
    /// A device exceeded the offline tolerance and was marked offline.
    Offline(Device),
    /// A raw decoded packet, published for every inbound datagram.
    Message { packet: Packet, addr: SocketAddr },
    /// A discovery round finished (its replies have been collected).
    DiscoveryCompleted { round: u64 },
    /// A non-fatal error, e.g. an undecodable datagram.
    Error(String),
}
