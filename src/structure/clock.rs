//! Time as an injected capability.
//!
//! The state machines never call `Instant::now()` or `thread::sleep`
//! directly. They read time through a shared [`Clock`] handle, which lets
//! tests substitute [`VirtualClock`] and run hours of protocol time in
//! microseconds.

use std::{
  sync::Mutex,
  thread,
  time::{Duration, Instant},
};

/// Monotonic time source plus the ability to wait.
///
/// `now()` values are absolute monotonic instants; timer deadlines computed
/// from them do not accumulate tick skew.
pub trait Clock: Send + Sync {
  fn now(&self) -> Instant;
  fn sleep(&self, duration: Duration);
}

/// The real thing: `Instant::now` and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
  fn now(&self) -> Instant {
    Instant::now()
  }

  fn sleep(&self, duration: Duration) {
    thread::sleep(duration);
  }
}

/// A deterministic clock for tests.
///
/// Time stands still until someone calls [`VirtualClock::advance`];
/// `sleep` advances the clock instead of blocking, so a tick loop driven
/// by a `VirtualClock` runs as fast as the CPU allows.
#[derive(Debug)]
pub struct VirtualClock {
  epoch: Instant,
  offset: Mutex<Duration>,
}

impl VirtualClock {
  pub fn new() -> Self {
    Self {
      epoch: Instant::now(),
      offset: Mutex::new(Duration::ZERO),
    }
  }

  /// Move simulated time forward.
  pub fn advance(&self, by: Duration) {
    *self.offset.lock().unwrap() += by;
  }

  /// How much simulated time has passed since construction.
  pub fn elapsed(&self) -> Duration {
    *self.offset.lock().unwrap()
  }
}

impl Default for VirtualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for VirtualClock {
  fn now(&self) -> Instant {
    self.epoch + *self.offset.lock().unwrap()
  }

  fn sleep(&self, duration: Duration) {
    self.advance(duration);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn virtual_clock_stands_still() {
    let clock = VirtualClock::new();
    let a = clock.now();
    let b = clock.now();
    assert_eq!(a, b);
  }

  #[test]
  fn virtual_clock_advances() {
    let clock = VirtualClock::new();
    let before = clock.now();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now() - before, Duration::from_secs(5));
  }

  #[test]
  fn virtual_sleep_is_advance() {
    let clock = VirtualClock::new();
    let before = clock.now();
    clock.sleep(Duration::from_millis(100));
    assert_eq!(clock.now() - before, Duration::from_millis(100));
  }

  #[test]
  fn monotonic_clock_moves_forward() {
    let clock = MonotonicClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
  }
}
