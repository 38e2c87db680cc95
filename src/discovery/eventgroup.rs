//! Provider-side eventgroup publish/subscribe state machine.

use std::{net::SocketAddr, sync::Arc, time::Instant};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use static_assertions::assert_impl_all;

use crate::{
  discovery::{
    config::EventgroupConfig,
    flags::{EventgroupFlags, ServiceStatus},
  },
  error::CreateResult,
  messages::Message,
  network::{udp_transport::UdpTransport, Transport},
  structure::{clock::Clock, timer::Timer},
};

/// Subscription phases while the service is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionPhase {
  NotSubscribed,
  Subscribed,
}

/// Top-level eventgroup state. The subscription phase exists only while
/// `ServiceUp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventgroupState {
  ServiceDown,
  ServiceUp(SubscriptionPhase),
}

/// Accepts and ages out eventgroup subscriptions.
///
/// Driven by [`step`](EventgroupStateMachine::step), one call per tick.
/// While the service is up, a `SubscribeEventgroup` is acknowledged and
/// granted a TTL lease; renewals push the lease forward, an explicit
/// `StopSubscribeEventgroup` or a lapsed lease drops it. Acknowledgements
/// go back to the subscriber's source address.
///
/// One subscriber is modeled, so the subscription counter is 0 or 1; a
/// multi-subscriber variant would have to track identity and lease per
/// subscriber.
pub struct EventgroupStateMachine<T: Transport> {
  config: EventgroupConfig,
  transport: T,
  flags: Arc<EventgroupFlags>,
  state: EventgroupState,
  subscription_counter: u32,
  subscriber: Option<SocketAddr>,
  ttl_timer: Timer,
}

assert_impl_all!(EventgroupStateMachine<UdpTransport>: Send);

impl<T: Transport> EventgroupStateMachine<T> {
  pub fn new(
    config: EventgroupConfig,
    transport: T,
    flags: Arc<EventgroupFlags>,
    clock: Arc<dyn Clock>,
  ) -> CreateResult<Self> {
    config.validate()?;
    Ok(Self {
      config,
      transport,
      flags,
      state: EventgroupState::ServiceDown,
      subscription_counter: 0,
      subscriber: None,
      ttl_timer: Timer::new(clock),
    })
  }

  pub fn state(&self) -> EventgroupState {
    self.state
  }

  pub fn subscription_count(&self) -> u32 {
    self.subscription_counter
  }

  /// Source address of the current subscriber, while subscribed.
  pub fn subscriber(&self) -> Option<SocketAddr> {
    self.subscriber
  }

  /// Deadline of the subscription lease, if armed.
  pub fn lease_deadline(&self) -> Option<Instant> {
    self.ttl_timer.deadline()
  }

  pub fn timer_armed(&self) -> bool {
    self.ttl_timer.is_armed()
  }

  /// Run one tick: poll at most one datagram, evaluate guards, transition.
  pub fn step(&mut self) {
    let inbound = self.transport.try_recv();
    match self.state {
      EventgroupState::ServiceDown => self.handle_service_down(),
      EventgroupState::ServiceUp(phase) => self.handle_service_up(phase, inbound),
    }
  }

  fn handle_service_down(&mut self) {
    if self.flags.service_status() == ServiceStatus::Up {
      self.state = EventgroupState::ServiceUp(SubscriptionPhase::NotSubscribed);
      info!("eventgroup: service up, accepting subscriptions");
    }
  }

  fn handle_service_up(&mut self, phase: SubscriptionPhase, inbound: Option<(Message, SocketAddr)>) {
    if self.flags.service_status() == ServiceStatus::Down {
      info!("eventgroup: service down");
      self.drop_subscription();
      self.state = EventgroupState::ServiceDown;
      return;
    }

    match phase {
      SubscriptionPhase::NotSubscribed => {
        if let Some((Message::SubscribeEventgroup, from)) = inbound {
          self.subscription_counter += 1;
          self.subscriber = Some(from);
          self.transport.send(Message::SubscribeEventgroupAck, from);
          self.state = EventgroupState::ServiceUp(SubscriptionPhase::Subscribed);
          self.ttl_timer.set(self.config.ttl);
          info!("eventgroup: {from} subscribed");
        }
      }
      SubscriptionPhase::Subscribed => match inbound {
        Some((Message::SubscribeEventgroup, from)) => {
          // Renewal: counter unchanged, lease pushed forward.
          self.subscriber = Some(from);
          self.transport.send(Message::SubscribeEventgroupAck, from);
          self.ttl_timer.set(self.config.ttl);
          debug!("eventgroup: {from} renewed");
        }
        Some((Message::StopSubscribeEventgroup, from)) => {
          info!("eventgroup: {from} unsubscribed");
          self.drop_subscription();
          self.state = EventgroupState::ServiceUp(SubscriptionPhase::NotSubscribed);
        }
        _ => {
          if self.ttl_timer.expired() && self.subscription_counter == 1 {
            info!("eventgroup: subscription lease lapsed");
            self.drop_subscription();
            self.state = EventgroupState::ServiceUp(SubscriptionPhase::NotSubscribed);
          }
        }
      },
    }
  }

  fn drop_subscription(&mut self) {
    self.subscription_counter = 0;
    self.subscriber = None;
    self.ttl_timer.cancel();
  }
}
