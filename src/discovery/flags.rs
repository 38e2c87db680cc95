//! Input flags shared between the application and a state machine.
//!
//! The application (or a test driver) owns one of these structures per
//! machine, hands the machine an `Arc` clone, and flips the flags from its
//! own thread. A machine reads each flag at most once per tick. Plain
//! atomics are all the synchronization this needs; there is no other
//! cross-thread state.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the provided service is up, from the eventgroup machine's
/// point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
  Down,
  Up,
}

/// Environment inputs of the provider machine. Both default to down.
#[derive(Debug, Default)]
pub struct ProviderFlags {
  ifstatus_up_and_configured: AtomicBool,
  service_status_up: AtomicBool,
}

impl ProviderFlags {
  pub fn set_ifstatus_up_and_configured(&self, up: bool) {
    self.ifstatus_up_and_configured.store(up, Ordering::SeqCst);
  }

  pub fn ifstatus_up_and_configured(&self) -> bool {
    self.ifstatus_up_and_configured.load(Ordering::SeqCst)
  }

  pub fn set_service_status_up(&self, up: bool) {
    self.service_status_up.store(up, Ordering::SeqCst);
  }

  pub fn service_status_up(&self) -> bool {
    self.service_status_up.load(Ordering::SeqCst)
  }
}

/// Environment inputs of the consumer machine. Both default to false.
#[derive(Debug, Default)]
pub struct ConsumerFlags {
  ifstatus_up_and_configured: AtomicBool,
  service_requested: AtomicBool,
}

impl ConsumerFlags {
  pub fn set_ifstatus_up_and_configured(&self, up: bool) {
    self.ifstatus_up_and_configured.store(up, Ordering::SeqCst);
  }

  pub fn ifstatus_up_and_configured(&self) -> bool {
    self.ifstatus_up_and_configured.load(Ordering::SeqCst)
  }

  pub fn set_service_requested(&self, requested: bool) {
    self.service_requested.store(requested, Ordering::SeqCst);
  }

  pub fn service_requested(&self) -> bool {
    self.service_requested.load(Ordering::SeqCst)
  }
}

/// Environment input of the eventgroup machine. Defaults to `Down`.
#[derive(Debug, Default)]
pub struct EventgroupFlags {
  service_up: AtomicBool,
}

impl EventgroupFlags {
  pub fn set_service_status(&self, status: ServiceStatus) {
    self
      .service_up
      .store(status == ServiceStatus::Up, Ordering::SeqCst);
  }

  pub fn service_status(&self) -> ServiceStatus {
    if self.service_up.load(Ordering::SeqCst) {
      ServiceStatus::Up
    } else {
      ServiceStatus::Down
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn provider_flags_default_down() {
    let flags = ProviderFlags::default();
    assert!(!flags.ifstatus_up_and_configured());
    assert!(!flags.service_status_up());
  }

  #[test]
  fn consumer_flags_round_trip() {
    let flags = ConsumerFlags::default();
    assert!(!flags.service_requested());
    flags.set_service_requested(true);
    flags.set_ifstatus_up_and_configured(true);
    assert!(flags.service_requested());
    assert!(flags.ifstatus_up_and_configured());
    flags.set_ifstatus_up_and_configured(false);
    assert!(!flags.ifstatus_up_and_configured());
  }

  #[test]
  fn eventgroup_status_round_trip() {
    let flags = EventgroupFlags::default();
    assert_eq!(flags.service_status(), ServiceStatus::Down);
    flags.set_service_status(ServiceStatus::Up);
    assert_eq!(flags.service_status(), ServiceStatus::Up);
    flags.set_service_status(ServiceStatus::Down);
    assert_eq!(flags.service_status(), ServiceStatus::Down);
  }
}
