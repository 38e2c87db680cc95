//! Datagram transport as an injected capability.

use std::net::SocketAddr;

use crate::messages::Message;

pub mod channel_transport;
pub mod udp_transport;

/// What the state machines need from the network: best-effort datagram
/// send and a bounded non-blocking receive.
///
/// No ordering is guaranteed between messages and any datagram may be
/// lost; the protocol encodes its own retry (repetition phase) and
/// liveness (TTL). A state machine calls `try_recv` at most once per tick,
/// so one datagram can never trigger two transitions.
pub trait Transport: Send {
  /// Enqueue one datagram towards `peer`. Never blocks beyond a bounded
  /// best-effort; on failure the datagram is dropped and logged.
  fn send(&mut self, message: Message, peer: SocketAddr);

  /// Pick up at most one pending datagram. Waits at most the transport's
  /// configured receive timeout. Datagrams with unknown tags have already
  /// been dropped at this boundary.
  fn try_recv(&mut self) -> Option<(Message, SocketAddr)>;
}
