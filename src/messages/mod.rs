//! Service discovery wire messages.
//!
//! Each UDP datagram carries exactly one ASCII tag, no header, no payload
//! and no framing. Datagrams whose payload is not one of the known tags are
//! dropped silently at the transport boundary.

use std::fmt;

/// The fixed set of service discovery message tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
  /// Consumer asks whether the service is available.
  FindService,
  /// Provider announces that the service is live.
  OfferService,
  /// Provider announces that the service is going down.
  StopOfferService,
  /// Consumer requests or renews an eventgroup subscription.
  SubscribeEventgroup,
  /// Provider acknowledges an eventgroup subscription.
  SubscribeEventgroupAck,
  /// Consumer cancels an eventgroup subscription.
  StopSubscribeEventgroup,
}

impl Message {
  /// The ASCII tag as it appears on the wire.
  pub fn wire_tag(self) -> &'static str {
    match self {
      Message::FindService => "FindService",
      Message::OfferService => "OfferService",
      Message::StopOfferService => "StopOfferService",
      Message::SubscribeEventgroup => "SubscribeEventgroup",
      Message::SubscribeEventgroupAck => "SubscribeEventgroupAck",
      Message::StopSubscribeEventgroup => "StopSubscribeEventgroup",
    }
  }

  /// Parse a datagram payload. `None` means an unknown tag, which the
  /// caller is expected to drop.
  pub fn from_wire(bytes: &[u8]) -> Option<Message> {
    match bytes {
      b"FindService" => Some(Message::FindService),
      b"OfferService" => Some(Message::OfferService),
      b"StopOfferService" => Some(Message::StopOfferService),
      b"SubscribeEventgroup" => Some(Message::SubscribeEventgroup),
      b"SubscribeEventgroupAck" => Some(Message::SubscribeEventgroupAck),
      b"StopSubscribeEventgroup" => Some(Message::StopSubscribeEventgroup),
      _ => None,
    }
  }
}

impl fmt::Display for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.wire_tag())
  }
}
