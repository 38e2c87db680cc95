//! A SOME/IP-style service discovery control plane.
//!
//! This crate implements the three cooperating finite state machines of a
//! SOME/IP-flavored service discovery (SD) layer:
//!
//! * [`ProviderStateMachine`] announces a service, answers discovery
//!   requests, and keeps up cyclic offers.
//! * [`ConsumerStateMachine`] discovers a service, tracks its liveness via
//!   TTL, and reacts to stop-offer notifications.
//! * [`EventgroupStateMachine`] accepts eventgroup subscriptions on the
//!   provider side, acknowledges them, and ages them out via TTL.
//!
//! Each machine is driven by a single-threaded tick loop: one tick reads at
//! most one inbound datagram, evaluates guards against the current state,
//! sends zero or more datagrams, and updates its timer. The machines do not
//! share state; they talk only through a [`Transport`].
//!
//! Wire messages are opaque ASCII tags on UDP datagrams (see [`Message`]) —
//! this is a faithful control-plane skeleton, not a wire-compatible
//! AUTOSAR SD stack.
//!
//! Time, randomness, and I/O are capabilities injected at construction
//! ([`Clock`], [`rand::RngCore`], [`Transport`]), so the protocol logic runs
//! identically over real UDP sockets and over deterministic in-memory
//! transports with a virtual clock.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use rand::{rngs::StdRng, SeedableRng};
//! use someip_sd::{
//!   Clock, ConsumerConfig, ConsumerFlags, ConsumerStateMachine, MonotonicClock, TickDriver,
//!   UdpTransport,
//! };
//!
//! # fn main() -> someip_sd::CreateResult<()> {
//! let clock: Arc<dyn Clock> = Arc::new(MonotonicClock);
//! let transport = UdpTransport::new("127.0.0.1:30491".parse().unwrap(), Duration::from_millis(10))?;
//! let flags = Arc::new(ConsumerFlags::default());
//!
//! let consumer = ConsumerStateMachine::new(
//!   ConsumerConfig::default(),
//!   transport,
//!   Arc::clone(&flags),
//!   Arc::clone(&clock),
//!   Box::new(StdRng::from_os_rng()),
//! )?;
//! let driver = TickDriver::spawn("consumer", consumer, Duration::from_millis(100), clock)?;
//!
//! flags.set_service_requested(true);
//! flags.set_ifstatus_up_and_configured(true);
//! // ... application runs ...
//! driver.stop();
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod error;
pub mod messages;
pub mod network;
pub mod structure;

pub use discovery::{
  config::{ConsumerConfig, EventgroupConfig, ProviderConfig},
  consumer::{ConsumerState, ConsumerStateMachine, SearchPhase},
  eventgroup::{EventgroupState, EventgroupStateMachine, SubscriptionPhase},
  flags::{ConsumerFlags, EventgroupFlags, ProviderFlags, ServiceStatus},
  provider::{ProviderPhase, ProviderState, ProviderStateMachine},
  tick_driver::{SdStateMachine, TickDriver},
};
pub use error::{CreateError, CreateResult};
pub use messages::Message;
pub use network::{
  channel_transport::{channel_pair, ChannelTransport},
  udp_transport::UdpTransport,
  Transport,
};
pub use structure::{
  clock::{Clock, MonotonicClock, VirtualClock},
  timer::Timer,
};
