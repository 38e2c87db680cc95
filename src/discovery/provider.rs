//! Provider-side service announcement state machine.

use std::{sync::Arc, time::Instant};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::RngCore;
use static_assertions::assert_impl_all;

use crate::{
  discovery::{config::ProviderConfig, flags::ProviderFlags},
  error::CreateResult,
  messages::Message,
  network::{udp_transport::UdpTransport, Transport},
  structure::{clock::Clock, timer::Timer},
};

/// Announcement phases of a ready provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPhase {
  /// Randomized quiet period before the first announcement.
  InitialWait,
  /// Exponentially spaced burst of announcements.
  Repetition,
  /// Steady-state cyclic announcements.
  Main,
}

/// Top-level provider state. The phase exists only while `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
  NotReady,
  Ready(ProviderPhase),
}

/// Announces a service over an opaque-tag datagram protocol.
///
/// Driven by [`step`](ProviderStateMachine::step), one call per tick.
/// From `NotReady`, the machine waits for the interface and the service to
/// come up, sits out a randomized initial wait, announces through an
/// exponential repetition burst, and settles into cyclic announcements.
/// Inbound `FindService` requests are answered with a deferred
/// `OfferService` so the tick loop never blocks.
pub struct ProviderStateMachine<T: Transport> {
  config: ProviderConfig,
  transport: T,
  flags: Arc<ProviderFlags>,
  rng: Box<dyn RngCore + Send>,
  state: ProviderState,
  run: u32,
  phase_timer: Timer,
  answer_timer: Timer,
}

assert_impl_all!(ProviderStateMachine<UdpTransport>: Send);

impl<T: Transport> ProviderStateMachine<T> {
  pub fn new(
    config: ProviderConfig,
    transport: T,
    flags: Arc<ProviderFlags>,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
  ) -> CreateResult<Self> {
    config.validate()?;
    Ok(Self {
      config,
      transport,
      flags,
      rng,
      state: ProviderState::NotReady,
      run: 0,
      phase_timer: Timer::new(Arc::clone(&clock)),
      answer_timer: Timer::new(clock),
    })
  }

  pub fn state(&self) -> ProviderState {
    self.state
  }

  /// How many repetition-phase announcements have gone out after the
  /// entry one.
  pub fn repetition_count(&self) -> u32 {
    self.run
  }

  /// Deadline of the phase timer, if armed.
  pub fn timer_deadline(&self) -> Option<Instant> {
    self.phase_timer.deadline()
  }

  pub fn timer_armed(&self) -> bool {
    self.phase_timer.is_armed()
  }

  /// Run one tick: poll at most one datagram, evaluate guards, transition.
  pub fn step(&mut self) {
    let inbound = self.transport.try_recv().map(|(message, _)| message);
    match self.state {
      ProviderState::NotReady => self.handle_not_ready(),
      ProviderState::Ready(phase) => self.handle_ready(phase, inbound),
    }
  }

  fn handle_not_ready(&mut self) {
    if self.flags.ifstatus_up_and_configured() && self.flags.service_status_up() {
      self.state = ProviderState::Ready(ProviderPhase::InitialWait);
      self.phase_timer.set_in_range(
        self.config.initial_delay_min,
        self.config.initial_delay_max,
        self.rng.as_mut(),
      );
      info!("provider: Ready, entering InitialWait");
    }
  }

  fn handle_ready(&mut self, phase: ProviderPhase, inbound: Option<Message>) {
    // Exit checks come before any substate handling.
    if !self.flags.ifstatus_up_and_configured() {
      info!("provider: interface down, going NotReady");
      self.enter_not_ready();
      return;
    }
    if !self.flags.service_status_up() {
      info!("provider: service down, going NotReady");
      self.transport.send(Message::StopOfferService, self.config.peer);
      self.enter_not_ready();
      return;
    }

    // A deferred answer to an earlier FindService fires ahead of the
    // regular phase action and must not eat a scheduled announcement.
    if self.answer_timer.expired() {
      self.answer_timer.cancel();
      debug!("provider: answering FindService");
      self.transport.send(Message::OfferService, self.config.peer);
      if phase == ProviderPhase::Main {
        self.phase_timer.set(self.config.cyclic_announce_delay);
      }
    }

    match phase {
      ProviderPhase::InitialWait => self.handle_initial_wait(),
      ProviderPhase::Repetition => self.handle_repetition(inbound),
      ProviderPhase::Main => self.handle_main(inbound),
    }
  }

  fn handle_initial_wait(&mut self) {
    if self.phase_timer.expired() {
      self.transport.send(Message::OfferService, self.config.peer);
      self.state = ProviderState::Ready(ProviderPhase::Repetition);
      self.run = 0;
      self.phase_timer.set(self.config.repetitions_base_delay);
      info!("provider: InitialWait over, entering Repetition");
    }
  }

  fn handle_repetition(&mut self, inbound: Option<Message>) {
    if inbound == Some(Message::FindService) {
      // Deferred answer only: run and the repetition timer are untouched.
      self.answer_timer.set(self.config.answer_delay);
      debug!("provider: FindService in Repetition, answer deferred");
    } else if self.phase_timer.expired() {
      if self.run < self.config.repetitions_max {
        self.transport.send(Message::OfferService, self.config.peer);
        self.run += 1;
        let delay = self.config.repetitions_base_delay * 2u32.pow(self.run);
        self.phase_timer.set(delay);
        debug!("provider: repetition {}, next in {:?}", self.run, delay);
      } else {
        self.state = ProviderState::Ready(ProviderPhase::Main);
        self.transport.send(Message::OfferService, self.config.peer);
        self.phase_timer.set(self.config.cyclic_announce_delay);
        info!("provider: Repetition exhausted, entering Main");
      }
    }
  }

  fn handle_main(&mut self, inbound: Option<Message>) {
    if inbound == Some(Message::FindService) {
      self.answer_timer.set(self.config.answer_delay);
      debug!("provider: FindService in Main, answer deferred");
    } else if self.phase_timer.expired() {
      self.transport.send(Message::OfferService, self.config.peer);
      self.phase_timer.set(self.config.cyclic_announce_delay);
      trace!("provider: cyclic announce");
    }
  }

  fn enter_not_ready(&mut self) {
    self.state = ProviderState::NotReady;
    self.run = 0;
    self.phase_timer.cancel();
    self.answer_timer.cancel();
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use rand::{rngs::StdRng, SeedableRng};

  use super::*;
  use crate::{
    network::channel_transport::{channel_pair, ChannelTransport},
    structure::clock::VirtualClock,
  };

  struct Fixture {
    clock: Arc<VirtualClock>,
    flags: Arc<ProviderFlags>,
    sm: ProviderStateMachine<ChannelTransport>,
    client: ChannelTransport,
  }

  fn service_addr() -> std::net::SocketAddr {
    "127.0.0.1:30490".parse().unwrap()
  }

  fn client_addr() -> std::net::SocketAddr {
    "127.0.0.1:30491".parse().unwrap()
  }

  // Degenerate initial wait so transition times are exact.
  fn test_config() -> ProviderConfig {
    ProviderConfig {
      peer: client_addr(),
      initial_delay_min: Duration::from_secs(1),
      initial_delay_max: Duration::from_secs(1),
      repetitions_base_delay: Duration::from_secs(1),
      repetitions_max: 3,
      cyclic_announce_delay: Duration::from_secs(5),
      answer_delay: Duration::from_millis(10),
    }
  }

  fn fixture(config: ProviderConfig) -> Fixture {
    let clock = Arc::new(VirtualClock::new());
    let flags = Arc::new(ProviderFlags::default());
    let (service_end, client_end) = channel_pair(service_addr(), client_addr());
    let sm = ProviderStateMachine::new(
      config,
      service_end,
      Arc::clone(&flags),
      clock.clone() as Arc<dyn Clock>,
      Box::new(StdRng::seed_from_u64(42)),
    )
    .unwrap();
    Fixture {
      clock,
      flags,
      sm,
      client: client_end,
    }
  }

  fn tick_after(fix: &mut Fixture, advance: Duration) {
    fix.clock.advance(advance);
    fix.sm.step();
  }

  fn tick_to_deadline(fix: &mut Fixture) {
    let delay = fix.sm.timer_deadline().unwrap() - fix.clock.now();
    tick_after(fix, delay);
  }

  fn drain(client: &mut ChannelTransport) -> Vec<Message> {
    let mut out = Vec::new();
    while let Some((message, _)) = client.try_recv() {
      out.push(message);
    }
    out
  }

  fn bring_up(fix: &mut Fixture) {
    fix.flags.set_ifstatus_up_and_configured(true);
    fix.flags.set_service_status_up(true);
    fix.sm.step();
  }

  #[test]
  fn starts_not_ready_with_disarmed_timer() {
    let fix = fixture(test_config());
    assert_eq!(fix.sm.state(), ProviderState::NotReady);
    assert!(!fix.sm.timer_armed());
  }

  #[test]
  fn one_flag_alone_is_not_enough() {
    let mut fix = fixture(test_config());
    fix.flags.set_ifstatus_up_and_configured(true);
    fix.sm.step();
    assert_eq!(fix.sm.state(), ProviderState::NotReady);

    fix.flags.set_ifstatus_up_and_configured(false);
    fix.flags.set_service_status_up(true);
    fix.sm.step();
    assert_eq!(fix.sm.state(), ProviderState::NotReady);
  }

  #[test]
  fn both_flags_enter_initial_wait_with_armed_timer() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    assert_eq!(
      fix.sm.state(),
      ProviderState::Ready(ProviderPhase::InitialWait)
    );
    assert!(fix.sm.timer_armed());
    assert!(drain(&mut fix.client).is_empty());
  }

  #[test]
  fn initial_wait_delay_is_within_configured_range() {
    let config = ProviderConfig {
      initial_delay_min: Duration::from_secs(1),
      initial_delay_max: Duration::from_secs(2),
      ..test_config()
    };
    let mut fix = fixture(config);
    bring_up(&mut fix);
    let delay = fix.sm.timer_deadline().unwrap() - fix.clock.now();
    assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(2));
  }

  #[test]
  fn initial_wait_expiry_announces_and_enters_repetition() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    tick_after(&mut fix, Duration::from_secs(1));
    assert_eq!(
      fix.sm.state(),
      ProviderState::Ready(ProviderPhase::Repetition)
    );
    assert_eq!(fix.sm.repetition_count(), 0);
    assert_eq!(drain(&mut fix.client), vec![Message::OfferService]);
    let delay = fix.sm.timer_deadline().unwrap() - fix.clock.now();
    assert_eq!(delay, Duration::from_secs(1));
  }

  #[test]
  fn repetition_backoff_doubles_then_enters_main() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    tick_after(&mut fix, Duration::from_secs(1)); // entry announcement
    drain(&mut fix.client);

    for (expected_run, delay) in [(1, 2), (2, 4), (3, 8)] {
      tick_to_deadline(&mut fix);
      assert_eq!(fix.sm.repetition_count(), expected_run);
      assert_eq!(drain(&mut fix.client), vec![Message::OfferService]);
      assert_eq!(
        fix.sm.timer_deadline().unwrap() - fix.clock.now(),
        Duration::from_secs(delay)
      );
    }

    // Exhausted: the next expiry transitions to Main and still announces.
    tick_after(&mut fix, Duration::from_secs(8));
    assert_eq!(fix.sm.state(), ProviderState::Ready(ProviderPhase::Main));
    assert_eq!(drain(&mut fix.client), vec![Message::OfferService]);
    assert_eq!(
      fix.sm.timer_deadline().unwrap() - fix.clock.now(),
      Duration::from_secs(5)
    );
    assert!(fix.sm.repetition_count() <= 3);
  }

  #[test]
  fn main_phase_announces_cyclically() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    tick_after(&mut fix, Duration::from_secs(1));
    // Three repetition expiries plus the one that enters Main.
    for _ in 0..4 {
      tick_to_deadline(&mut fix);
    }
    assert_eq!(fix.sm.state(), ProviderState::Ready(ProviderPhase::Main));
    drain(&mut fix.client);

    tick_after(&mut fix, Duration::from_secs(5));
    assert_eq!(drain(&mut fix.client), vec![Message::OfferService]);
    tick_after(&mut fix, Duration::from_secs(5));
    assert_eq!(drain(&mut fix.client), vec![Message::OfferService]);
    assert_eq!(fix.sm.state(), ProviderState::Ready(ProviderPhase::Main));
  }

  #[test]
  fn find_service_in_repetition_is_answered_without_touching_the_ladder() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    tick_after(&mut fix, Duration::from_secs(1));
    drain(&mut fix.client);
    let ladder_deadline = fix.sm.timer_deadline().unwrap();

    fix.client.send(Message::FindService, service_addr());
    tick_after(&mut fix, Duration::from_millis(100));
    // Deferred: nothing on the wire yet, ladder untouched.
    assert!(drain(&mut fix.client).is_empty());
    assert_eq!(fix.sm.repetition_count(), 0);
    assert_eq!(fix.sm.timer_deadline(), Some(ladder_deadline));

    tick_after(&mut fix, Duration::from_millis(100));
    assert_eq!(drain(&mut fix.client), vec![Message::OfferService]);
    assert_eq!(fix.sm.repetition_count(), 0);
    assert_eq!(fix.sm.timer_deadline(), Some(ladder_deadline));
  }

  #[test]
  fn find_service_in_main_rearms_the_cyclic_timer_at_answer_time() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    tick_after(&mut fix, Duration::from_secs(1));
    for _ in 0..3 {
      tick_to_deadline(&mut fix);
    }
    tick_after(&mut fix, Duration::from_secs(8));
    assert_eq!(fix.sm.state(), ProviderState::Ready(ProviderPhase::Main));
    drain(&mut fix.client);

    fix.client.send(Message::FindService, service_addr());
    tick_after(&mut fix, Duration::from_millis(100));
    assert!(drain(&mut fix.client).is_empty());
    tick_after(&mut fix, Duration::from_millis(100));
    assert_eq!(drain(&mut fix.client), vec![Message::OfferService]);
    assert_eq!(
      fix.sm.timer_deadline().unwrap() - fix.clock.now(),
      Duration::from_secs(5)
    );
  }

  #[test]
  fn deferred_answer_does_not_suppress_a_scheduled_announcement() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    tick_after(&mut fix, Duration::from_secs(1));
    drain(&mut fix.client);

    // FindService lands just before the repetition deadline; on the next
    // tick both the answer and the scheduled announcement are due.
    tick_after(&mut fix, Duration::from_millis(995));
    fix.client.send(Message::FindService, service_addr());
    fix.sm.step();
    assert!(drain(&mut fix.client).is_empty());

    tick_after(&mut fix, Duration::from_millis(100));
    assert_eq!(
      drain(&mut fix.client),
      vec![Message::OfferService, Message::OfferService]
    );
    assert_eq!(fix.sm.repetition_count(), 1);
  }

  #[test]
  fn interface_down_goes_not_ready_silently() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    tick_after(&mut fix, Duration::from_secs(1));
    drain(&mut fix.client);

    fix.flags.set_ifstatus_up_and_configured(false);
    fix.sm.step();
    assert_eq!(fix.sm.state(), ProviderState::NotReady);
    assert!(!fix.sm.timer_armed());
    assert!(drain(&mut fix.client).is_empty());
  }

  #[test]
  fn service_down_goes_not_ready_with_one_stop_offer() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    tick_after(&mut fix, Duration::from_secs(1));
    drain(&mut fix.client);

    fix.flags.set_service_status_up(false);
    fix.sm.step();
    assert_eq!(fix.sm.state(), ProviderState::NotReady);
    assert_eq!(drain(&mut fix.client), vec![Message::StopOfferService]);

    // Staying down emits nothing further.
    fix.sm.step();
    fix.sm.step();
    assert!(drain(&mut fix.client).is_empty());
  }

  #[test]
  fn machine_is_reusable_after_not_ready() {
    let mut fix = fixture(test_config());
    bring_up(&mut fix);
    fix.flags.set_service_status_up(false);
    fix.sm.step();
    drain(&mut fix.client);

    fix.flags.set_service_status_up(true);
    fix.sm.step();
    assert_eq!(
      fix.sm.state(),
      ProviderState::Ready(ProviderPhase::InitialWait)
    );
    assert_eq!(fix.sm.repetition_count(), 0);
  }

  #[test]
  fn invalid_config_fails_construction() {
    let clock = Arc::new(VirtualClock::new());
    let (service_end, _client_end) = channel_pair(service_addr(), client_addr());
    let config = ProviderConfig {
      initial_delay_min: Duration::from_secs(5),
      initial_delay_max: Duration::from_secs(1),
      ..test_config()
    };
    let result = ProviderStateMachine::new(
      config,
      service_end,
      Arc::new(ProviderFlags::default()),
      clock as Arc<dyn Clock>,
      Box::new(StdRng::seed_from_u64(42)),
    );
    assert!(result.is_err());
  }
}
