//! In-memory loopback transport for deterministic tests.

use std::{
  net::SocketAddr,
  sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError},
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{messages::Message, network::Transport};

// Far more than a state machine sends between ticks; overflow is treated
// as datagram loss, which the protocol tolerates anyway.
const CHANNEL_CAPACITY: usize = 64;

/// One endpoint of an in-memory datagram pair.
///
/// Behaves like a UDP socket that can only reach its twin: sends addressed
/// to anyone else are dropped, a full queue drops the datagram, ordering is
/// preserved only as an artifact of the channel. Built by [`channel_pair`].
pub struct ChannelTransport {
  local_addr: SocketAddr,
  peer_addr: SocketAddr,
  to_peer: SyncSender<(Message, SocketAddr)>,
  inbound: Receiver<(Message, SocketAddr)>,
}

/// Two connected [`ChannelTransport`] endpoints with the given synthetic
/// addresses.
pub fn channel_pair(
  a_addr: SocketAddr,
  b_addr: SocketAddr,
) -> (ChannelTransport, ChannelTransport) {
  let (a_to_b, b_inbound) = sync_channel(CHANNEL_CAPACITY);
  let (b_to_a, a_inbound) = sync_channel(CHANNEL_CAPACITY);
  (
    ChannelTransport {
      local_addr: a_addr,
      peer_addr: b_addr,
      to_peer: a_to_b,
      inbound: a_inbound,
    },
    ChannelTransport {
      local_addr: b_addr,
      peer_addr: a_addr,
      to_peer: b_to_a,
      inbound: b_inbound,
    },
  )
}

impl ChannelTransport {
  pub fn local_addr(&self) -> SocketAddr {
    self.local_addr
  }
}

impl Transport for ChannelTransport {
  fn send(&mut self, message: Message, peer: SocketAddr) {
    if peer != self.peer_addr {
      debug!("no route from {} to {peer}, dropping {message}", self.local_addr);
      return;
    }
    match self.to_peer.try_send((message, self.local_addr)) {
      Ok(()) => trace!("sent {message} to {peer}"),
      Err(TrySendError::Full(_)) => debug!("queue to {peer} full, dropping {message}"),
      Err(TrySendError::Disconnected(_)) => debug!("{peer} gone, dropping {message}"),
    }
  }

  fn try_recv(&mut self) -> Option<(Message, SocketAddr)> {
    self.inbound.try_recv().ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addrs() -> (SocketAddr, SocketAddr) {
    (
      "127.0.0.1:30490".parse().unwrap(),
      "127.0.0.1:30491".parse().unwrap(),
    )
  }

  #[test]
  fn pair_delivers_both_ways() {
    let (provider_addr, consumer_addr) = addrs();
    let (mut provider, mut consumer) = channel_pair(provider_addr, consumer_addr);

    provider.send(Message::OfferService, consumer_addr);
    assert_eq!(
      consumer.try_recv(),
      Some((Message::OfferService, provider_addr))
    );

    consumer.send(Message::FindService, provider_addr);
    assert_eq!(
      provider.try_recv(),
      Some((Message::FindService, consumer_addr))
    );
  }

  #[test]
  fn empty_queue_yields_none() {
    let (provider_addr, consumer_addr) = addrs();
    let (mut provider, _consumer) = channel_pair(provider_addr, consumer_addr);
    assert_eq!(provider.try_recv(), None);
  }

  #[test]
  fn unroutable_peer_drops_silently() {
    let (provider_addr, consumer_addr) = addrs();
    let (mut provider, mut consumer) = channel_pair(provider_addr, consumer_addr);
    provider.send(Message::OfferService, "127.0.0.1:9999".parse().unwrap());
    assert_eq!(consumer.try_recv(), None);
  }

  #[test]
  fn overflow_is_loss_not_panic() {
    let (provider_addr, consumer_addr) = addrs();
    let (mut provider, mut consumer) = channel_pair(provider_addr, consumer_addr);
    for _ in 0..(CHANNEL_CAPACITY + 10) {
      provider.send(Message::OfferService, consumer_addr);
    }
    let mut received = 0;
    while consumer.try_recv().is_some() {
      received += 1;
    }
    assert_eq!(received, CHANNEL_CAPACITY);
  }
}
