//! Dedicated tick-loop thread for one state machine.

use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  thread::JoinHandle,
  time::Duration,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{
  error::CreateResult,
  network::Transport,
  structure::clock::Clock,
};

/// Anything the [`TickDriver`] can drive: one dispatch step per tick.
pub trait SdStateMachine: Send {
  fn step(&mut self);
}

impl<T: Transport> SdStateMachine for crate::discovery::provider::ProviderStateMachine<T> {
  fn step(&mut self) {
    Self::step(self);
  }
}

impl<T: Transport> SdStateMachine for crate::discovery::consumer::ConsumerStateMachine<T> {
  fn step(&mut self) {
    Self::step(self);
  }
}

impl<T: Transport> SdStateMachine for crate::discovery::eventgroup::EventgroupStateMachine<T> {
  fn step(&mut self) {
    Self::step(self);
  }
}

/// Owns the thread running one state machine's cooperative tick loop.
///
/// The loop checks the stop flag, runs one step, then sleeps one tick
/// period on the injected clock, so cancellation latency is bounded by one
/// tick period plus one receive timeout. The driver performs no protocol
/// logic. Stopping is final; the machine is not restartable.
pub struct TickDriver {
  stop_flag: Arc<AtomicBool>,
  join_handle: Option<JoinHandle<()>>,
}

impl TickDriver {
  /// Move `sm` onto a named thread ticking every `tick_period`.
  pub fn spawn<S>(
    name: &str,
    mut sm: S,
    tick_period: Duration,
    clock: Arc<dyn Clock>,
  ) -> CreateResult<Self>
  where
    S: SdStateMachine + 'static,
  {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let thread_flag = Arc::clone(&stop_flag);
    let join_handle = std::thread::Builder::new()
      .name(format!("sd-{name}"))
      .spawn(move || {
        while !thread_flag.load(Ordering::SeqCst) {
          sm.step();
          clock.sleep(tick_period);
        }
        debug!("tick loop done");
      })?;
    Ok(Self {
      stop_flag,
      join_handle: Some(join_handle),
    })
  }

  /// Request cancellation and wait for the tick loop to wind down.
  pub fn stop(mut self) {
    self.stop_and_join();
  }

  fn stop_and_join(&mut self) {
    self.stop_flag.store(true, Ordering::SeqCst);
    if let Some(handle) = self.join_handle.take() {
      if handle.join().is_err() {
        error!("tick thread panicked");
      }
    }
  }
}

impl Drop for TickDriver {
  fn drop(&mut self) {
    self.stop_and_join();
  }
}
