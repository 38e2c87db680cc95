//! Consumer-side service discovery state machine.

use std::{sync::Arc, time::Instant};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::RngCore;
use static_assertions::assert_impl_all;

use crate::{
  discovery::{config::ConsumerConfig, flags::ConsumerFlags},
  error::CreateResult,
  messages::Message,
  network::{udp_transport::UdpTransport, Transport},
  structure::{clock::Clock, timer::Timer},
};

/// Search phases while looking for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
  /// Randomized quiet period before the first request.
  InitialWait,
  /// Exponentially spaced burst of requests.
  Repetition,
}

/// Top-level consumer state. The search phase exists only while
/// `SearchingForService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
  NotRequested,
  RequestedButNotReady,
  SearchingForService(SearchPhase),
  ServiceReady,
  Stopped,
}

/// Discovers a service and tracks its liveness.
///
/// Driven by [`step`](ConsumerStateMachine::step), one call per tick.
/// Once the application requests the service and the interface is up, the
/// machine searches with an initial wait plus an exponential request
/// burst. A received `OfferService` makes the service ready for `ttl`;
/// further offers refresh the lease, a lapsed lease restarts the search,
/// a `StopOfferService` or an exhausted burst parks the machine in
/// `Stopped`.
///
/// Within a tick at most one inbound datagram is consumed and the first
/// matching guard wins; timer expiry is only evaluated when no message
/// matched, so a single datagram can never trigger two transitions.
pub struct ConsumerStateMachine<T: Transport> {
  config: ConsumerConfig,
  transport: T,
  flags: Arc<ConsumerFlags>,
  rng: Box<dyn RngCore + Send>,
  state: ConsumerState,
  run: u32,
  timer: Timer,
}

assert_impl_all!(ConsumerStateMachine<UdpTransport>: Send);

impl<T: Transport> ConsumerStateMachine<T> {
  pub fn new(
    config: ConsumerConfig,
    transport: T,
    flags: Arc<ConsumerFlags>,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
  ) -> CreateResult<Self> {
    config.validate()?;
    Ok(Self {
      config,
      transport,
      flags,
      rng,
      state: ConsumerState::NotRequested,
      run: 0,
      timer: Timer::new(clock),
    })
  }

  pub fn state(&self) -> ConsumerState {
    self.state
  }

  /// How many find-service retries have gone out after the entry one.
  pub fn repetition_count(&self) -> u32 {
    self.run
  }

  /// Deadline of the search/TTL timer, if armed.
  pub fn timer_deadline(&self) -> Option<Instant> {
    self.timer.deadline()
  }

  pub fn timer_armed(&self) -> bool {
    self.timer.is_armed()
  }

  /// Run one tick: poll at most one datagram, evaluate guards, transition.
  pub fn step(&mut self) {
    let inbound = self.transport.try_recv().map(|(message, _)| message);
    match self.state {
      ConsumerState::NotRequested => self.handle_not_requested(),
      ConsumerState::RequestedButNotReady => self.handle_requested_but_not_ready(),
      ConsumerState::SearchingForService(phase) => self.handle_searching(phase, inbound),
      ConsumerState::ServiceReady => self.handle_service_ready(inbound),
      ConsumerState::Stopped => self.handle_stopped(inbound),
    }
  }

  fn handle_not_requested(&mut self) {
    if !self.flags.service_requested() {
      return;
    }
    if self.flags.ifstatus_up_and_configured() {
      self.enter_search();
    } else {
      self.state = ConsumerState::RequestedButNotReady;
      info!("consumer: requested, waiting for the interface");
    }
  }

  fn handle_requested_but_not_ready(&mut self) {
    if self.flags.ifstatus_up_and_configured() {
      self.enter_search();
    }
  }

  fn handle_searching(&mut self, phase: SearchPhase, inbound: Option<Message>) {
    if !self.flags.ifstatus_up_and_configured() {
      self.timer.cancel();
      self.state = ConsumerState::RequestedButNotReady;
      info!("consumer: interface down while searching");
      return;
    }
    // An offer short-circuits either search phase.
    if inbound == Some(Message::OfferService) {
      self.timer.set(self.config.ttl);
      self.state = ConsumerState::ServiceReady;
      info!("consumer: offer received, ServiceReady");
      return;
    }

    match phase {
      SearchPhase::InitialWait => {
        if self.timer.expired() {
          self.transport.send(Message::FindService, self.config.peer);
          self.state = ConsumerState::SearchingForService(SearchPhase::Repetition);
          self.run = 0;
          self.timer.set(self.config.repetitions_base_delay);
          info!("consumer: InitialWait over, entering Repetition");
        }
      }
      SearchPhase::Repetition => {
        if inbound == Some(Message::StopOfferService) {
          self.timer.cancel();
          self.state = ConsumerState::Stopped;
          info!("consumer: stop-offer while searching, Stopped");
        } else if self.timer.expired() {
          if self.run < self.config.repetitions_max {
            self.transport.send(Message::FindService, self.config.peer);
            self.run += 1;
            let delay = self.config.repetitions_base_delay * 2u32.pow(self.run);
            self.timer.set(delay);
            debug!("consumer: retry {}, next in {:?}", self.run, delay);
          } else {
            self.timer.cancel();
            self.state = ConsumerState::Stopped;
            info!("consumer: search exhausted, Stopped");
          }
        }
      }
    }
  }

  fn handle_service_ready(&mut self, inbound: Option<Message>) {
    if inbound == Some(Message::OfferService) {
      // Liveness refresh: back to a full TTL, not TTL minus elapsed.
      self.timer.set(self.config.ttl);
      trace!("consumer: offer refresh");
    } else if self.timer.expired() {
      info!("consumer: TTL lapsed, searching again");
      self.enter_search();
    } else if !self.flags.ifstatus_up_and_configured() {
      self.timer.cancel();
      self.state = ConsumerState::RequestedButNotReady;
      info!("consumer: interface down, leaving ServiceReady");
    } else if inbound == Some(Message::StopOfferService) {
      self.timer.cancel();
      self.state = ConsumerState::Stopped;
      info!("consumer: stop-offer received, Stopped");
    }
  }

  fn handle_stopped(&mut self, inbound: Option<Message>) {
    if !self.flags.service_requested() {
      self.state = ConsumerState::NotRequested;
      info!("consumer: request withdrawn, NotRequested");
    } else if inbound == Some(Message::OfferService) {
      self.timer.set(self.config.ttl);
      self.state = ConsumerState::ServiceReady;
      info!("consumer: offer received while Stopped, ServiceReady");
    }
  }

  fn enter_search(&mut self) {
    self.state = ConsumerState::SearchingForService(SearchPhase::InitialWait);
    self.timer.set_in_range(
      self.config.initial_delay_min,
      self.config.initial_delay_max,
      self.rng.as_mut(),
    );
    info!("consumer: searching, entering InitialWait");
  }
}
