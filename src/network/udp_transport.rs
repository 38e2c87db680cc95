//! UDP datagram endpoint with a bounded-wait receive.

use std::{io, net::SocketAddr, time::Duration};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use mio::{net::UdpSocket, Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};

use crate::{error::CreateResult, messages::Message, network::Transport};

// Matches the message tags with ample headroom; an SD datagram is one tag.
const RECV_BUFFER_SIZE: usize = 1024;

const RECV_TOKEN: Token = Token(0);

/// A [`Transport`] over one bound UDP socket.
///
/// The socket is non-blocking; `try_recv` uses a `mio` poll with the
/// configured `recv_timeout` as the bounded wait, then attempts exactly one
/// `recv_from`. The receive timeout is an I/O detail, not a protocol
/// timeout, and should be well below the tick period.
pub struct UdpTransport {
  socket: UdpSocket,
  poll: Poll,
  events: Events,
  recv_timeout: Duration,
  recv_buf: [u8; RECV_BUFFER_SIZE],
}

impl UdpTransport {
  /// Bind `local_addr` and set the socket up for non-blocking use.
  ///
  /// Bind failure is fatal: the state machine that would have consumed
  /// this transport is never constructed.
  pub fn new(local_addr: SocketAddr, recv_timeout: Duration) -> CreateResult<Self> {
    let raw = Socket::new(Domain::for_address(local_addr), Type::DGRAM, Some(Protocol::UDP))?;
    raw.set_reuse_address(true)?;
    raw.set_nonblocking(true)?;
    raw.bind(&local_addr.into())?;

    let mut socket = UdpSocket::from_std(raw.into());
    let poll = Poll::new()?;
    poll
      .registry()
      .register(&mut socket, RECV_TOKEN, Interest::READABLE)?;
    info!("UdpTransport bound to {:?}", socket.local_addr());

    Ok(Self {
      socket,
      poll,
      events: Events::with_capacity(4),
      recv_timeout,
      recv_buf: [0; RECV_BUFFER_SIZE],
    })
  }

  /// The actual bound address. Useful when binding port 0.
  pub fn local_addr(&self) -> io::Result<SocketAddr> {
    self.socket.local_addr()
  }
}

impl Transport for UdpTransport {
  fn send(&mut self, message: Message, peer: SocketAddr) {
    match self.socket.send_to(message.wire_tag().as_bytes(), peer) {
      Ok(_) => trace!("sent {message} to {peer}"),
      Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
        debug!("send of {message} to {peer} would block, dropping");
      }
      Err(e) => warn!("send of {message} to {peer} failed: {e}"),
    }
  }

  fn try_recv(&mut self) -> Option<(Message, SocketAddr)> {
    if let Err(e) = self.poll.poll(&mut self.events, Some(self.recv_timeout)) {
      warn!("poll failed: {e}");
      return None;
    }
    // Attempt the receive even if poll reported nothing: readiness may have
    // been consumed on an earlier tick that left a datagram unread.
    match self.socket.recv_from(&mut self.recv_buf) {
      Ok((len, from)) => match Message::from_wire(&self.recv_buf[..len]) {
        Some(message) => {
          trace!("received {message} from {from}");
          Some((message, from))
        }
        None => {
          debug!("dropping unrecognized {len}-byte datagram from {from}");
          None
        }
      },
      Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
      Err(e) => {
        warn!("receive failed: {e}");
        None
      }
    }
  }
}
