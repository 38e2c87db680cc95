//! Per-machine configuration.
//!
//! Protocol constants, the peer endpoint, and nothing else: no environment
//! variables, no files, no persisted state. Tick period and receive
//! timeout live with the tick driver and the transport respectively.
//! Invalid configurations are rejected at state machine construction.

use std::{
  net::{Ipv4Addr, SocketAddr},
  time::Duration,
};

use crate::{
  discovery::{DEFAULT_CLIENT_PORT, DEFAULT_SERVICE_PORT},
  error::{config_error, CreateResult},
};

/// Configuration of the provider (service announcement) machine.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
  /// Where offers and stop-offers are sent.
  pub peer: SocketAddr,
  /// Lower bound of the randomized initial wait.
  pub initial_delay_min: Duration,
  /// Upper bound of the randomized initial wait.
  pub initial_delay_max: Duration,
  /// Base delay of the exponential repetition phase.
  pub repetitions_base_delay: Duration,
  /// Number of repetition-phase announcements after the entry one.
  pub repetitions_max: u32,
  /// Announcement interval in the main phase.
  pub cyclic_announce_delay: Duration,
  /// How long to defer an `OfferService` answering a `FindService`.
  /// May be shorter than the tick period; the answer then goes out on the
  /// next tick.
  pub answer_delay: Duration,
}

impl Default for ProviderConfig {
  fn default() -> Self {
    Self {
      peer: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_CLIENT_PORT)),
      initial_delay_min: Duration::from_secs(1),
      initial_delay_max: Duration::from_secs(2),
      repetitions_base_delay: Duration::from_secs(1),
      repetitions_max: 3,
      cyclic_announce_delay: Duration::from_secs(5),
      answer_delay: Duration::from_millis(10),
    }
  }
}

impl ProviderConfig {
  pub fn validate(&self) -> CreateResult<()> {
    if self.initial_delay_min > self.initial_delay_max {
      return Err(config_error(format!(
        "initial_delay_min {:?} exceeds initial_delay_max {:?}",
        self.initial_delay_min, self.initial_delay_max
      )));
    }
    if self.repetitions_base_delay.is_zero() {
      return Err(config_error("repetitions_base_delay must be non-zero"));
    }
    if self.repetitions_max > 30 {
      return Err(config_error(format!(
        "repetitions_max {} overflows the exponential backoff",
        self.repetitions_max
      )));
    }
    if self.cyclic_announce_delay.is_zero() {
      return Err(config_error("cyclic_announce_delay must be non-zero"));
    }
    Ok(())
  }
}

/// Configuration of the consumer (service discovery) machine.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
  /// Where find-service requests are sent.
  pub peer: SocketAddr,
  pub initial_delay_min: Duration,
  pub initial_delay_max: Duration,
  pub repetitions_base_delay: Duration,
  /// Number of find-service retries after the entry one.
  pub repetitions_max: u32,
  /// Validity of a received offer; refreshed by every further offer.
  pub ttl: Duration,
}

impl Default for ConsumerConfig {
  fn default() -> Self {
    Self {
      peer: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_SERVICE_PORT)),
      initial_delay_min: Duration::from_secs(1),
      initial_delay_max: Duration::from_secs(2),
      repetitions_base_delay: Duration::from_secs(1),
      repetitions_max: 3,
      ttl: Duration::from_secs(5),
    }
  }
}

impl ConsumerConfig {
  pub fn validate(&self) -> CreateResult<()> {
    if self.initial_delay_min > self.initial_delay_max {
      return Err(config_error(format!(
        "initial_delay_min {:?} exceeds initial_delay_max {:?}",
        self.initial_delay_min, self.initial_delay_max
      )));
    }
    if self.repetitions_base_delay.is_zero() {
      return Err(config_error("repetitions_base_delay must be non-zero"));
    }
    if self.repetitions_max > 30 {
      return Err(config_error(format!(
        "repetitions_max {} overflows the exponential backoff",
        self.repetitions_max
      )));
    }
    if self.ttl.is_zero() {
      return Err(config_error("ttl must be non-zero"));
    }
    Ok(())
  }
}

/// Configuration of the eventgroup publish/subscribe machine.
///
/// The eventgroup machine never initiates traffic; acknowledgements go back
/// to whoever subscribed, so there is no static peer here.
#[derive(Debug, Clone)]
pub struct EventgroupConfig {
  /// Subscription lease; renewed by every further subscribe.
  pub ttl: Duration,
}

impl Default for EventgroupConfig {
  fn default() -> Self {
    Self {
      ttl: Duration::from_secs(5),
    }
  }
}

impl EventgroupConfig {
  pub fn validate(&self) -> CreateResult<()> {
    if self.ttl.is_zero() {
      return Err(config_error("ttl must be non-zero"));
    }
    Ok(())
  }
}
