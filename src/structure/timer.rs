//! One-shot protocol timer.

use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use rand::{Rng, RngCore};

use crate::structure::clock::Clock;

/// A one-shot timer holding an optional absolute deadline.
///
/// All protocol timeouts (initial wait, repetition backoff, cyclic
/// announce, TTL) are expressed through this type. A disarmed timer is
/// semantically distinct from an expired one: it never expires.
pub struct Timer {
  clock: Arc<dyn Clock>,
  deadline: Option<Instant>,
}

impl Timer {
  /// A new, disarmed timer reading time from `clock`.
  pub fn new(clock: Arc<dyn Clock>) -> Self {
    Self {
      clock,
      deadline: None,
    }
  }

  /// Arm with deadline `now + delay`, overwriting any prior deadline.
  pub fn set(&mut self, delay: Duration) {
    self.deadline = Some(self.clock.now() + delay);
  }

  /// Arm with a deadline drawn uniformly from `now + [min, max]`.
  ///
  /// With `min == max` this degenerates to [`Timer::set`].
  pub fn set_in_range(&mut self, min: Duration, max: Duration, rng: &mut dyn RngCore) {
    let delay = if max > min {
      let span = (max - min).as_nanos() as u64;
      min + Duration::from_nanos(rng.random_range(0..=span))
    } else {
      min
    };
    self.set(delay);
  }

  /// Disarm.
  pub fn cancel(&mut self) {
    self.deadline = None;
  }

  /// `true` iff armed and the deadline has been reached.
  pub fn expired(&self) -> bool {
    self
      .deadline
      .is_some_and(|deadline| self.clock.now() >= deadline)
  }

  pub fn is_armed(&self) -> bool {
    self.deadline.is_some()
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }
}
