//! Provider, consumer, and eventgroup machines on UDP loopback.
//!
//! Runs the full discovery handshake for twenty seconds (or until Ctrl-C),
//! then takes the service down so the stop-offer path is visible too.
//! Transitions are logged; try `RUST_LOG=debug cargo run --example sd_demo`.

use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  thread,
  time::Duration,
};

use log::info;
use rand::{rngs::StdRng, SeedableRng};
use someip_sd::{
  Clock, ConsumerConfig, ConsumerFlags, ConsumerStateMachine, EventgroupConfig, EventgroupFlags,
  EventgroupStateMachine, MonotonicClock, ProviderConfig, ProviderFlags, ProviderStateMachine,
  ServiceStatus, TickDriver, UdpTransport,
};

const RECV_TIMEOUT: Duration = Duration::from_millis(10);
const PROVIDER_TICK: Duration = Duration::from_millis(10);
const TICK: Duration = Duration::from_millis(100);

fn main() -> anyhow::Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let clock: Arc<dyn Clock> = Arc::new(MonotonicClock);

  let provider_flags = Arc::new(ProviderFlags::default());
  let consumer_flags = Arc::new(ConsumerFlags::default());
  let eventgroup_flags = Arc::new(EventgroupFlags::default());

  let provider = ProviderStateMachine::new(
    ProviderConfig::default(),
    UdpTransport::new("127.0.0.1:30490".parse().unwrap(), RECV_TIMEOUT)?,
    Arc::clone(&provider_flags),
    Arc::clone(&clock),
    Box::new(StdRng::from_os_rng()),
  )?;
  let consumer = ConsumerStateMachine::new(
    ConsumerConfig::default(),
    UdpTransport::new("127.0.0.1:30491".parse().unwrap(), RECV_TIMEOUT)?,
    Arc::clone(&consumer_flags),
    Arc::clone(&clock),
    Box::new(StdRng::from_os_rng()),
  )?;
  let eventgroup = EventgroupStateMachine::new(
    EventgroupConfig::default(),
    UdpTransport::new("127.0.0.1:30500".parse().unwrap(), RECV_TIMEOUT)?,
    Arc::clone(&eventgroup_flags),
    Arc::clone(&clock),
  )?;

  let provider_driver = TickDriver::spawn("provider", provider, PROVIDER_TICK, Arc::clone(&clock))?;
  let consumer_driver = TickDriver::spawn("consumer", consumer, TICK, Arc::clone(&clock))?;
  let eventgroup_driver = TickDriver::spawn("eventgroup", eventgroup, TICK, Arc::clone(&clock))?;

  let running = Arc::new(AtomicBool::new(true));
  let handler_flag = Arc::clone(&running);
  ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))?;

  info!("bringing interface and service up");
  provider_flags.set_ifstatus_up_and_configured(true);
  provider_flags.set_service_status_up(true);
  eventgroup_flags.set_service_status(ServiceStatus::Up);
  consumer_flags.set_service_requested(true);
  consumer_flags.set_ifstatus_up_and_configured(true);

  for _ in 0..200 {
    if !running.load(Ordering::SeqCst) {
      break;
    }
    thread::sleep(Duration::from_millis(100));
  }

  info!("taking the service down");
  provider_flags.set_service_status_up(false);
  eventgroup_flags.set_service_status(ServiceStatus::Down);
  thread::sleep(Duration::from_millis(500));

  provider_driver.stop();
  consumer_driver.stop();
  eventgroup_driver.stop();
  info!("done");
  Ok(())
}
