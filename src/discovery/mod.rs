//! The service discovery state machines and their tick-loop driver.
//!
//! Three machines share a uniform skeleton: a tick reads at most one
//! inbound datagram, evaluates guards against the current state and timer,
//! emits zero or more datagrams, and transitions. Input flags are written
//! by the application from another thread and read once per tick.

pub mod config;
pub mod consumer;
pub mod eventgroup;
pub mod flags;
pub mod provider;
pub mod tick_driver;

pub use config::{ConsumerConfig, EventgroupConfig, ProviderConfig};
pub use consumer::{ConsumerState, ConsumerStateMachine, SearchPhase};
pub use eventgroup::{EventgroupState, EventgroupStateMachine, SubscriptionPhase};
pub use flags::{ConsumerFlags, EventgroupFlags, ProviderFlags, ServiceStatus};
pub use provider::{ProviderPhase, ProviderState, ProviderStateMachine};
pub use tick_driver::{SdStateMachine, TickDriver};

/// Default port of the provider ("service") endpoint.
pub const DEFAULT_SERVICE_PORT: u16 = 30490;
/// Default port of the consumer ("client") endpoint.
pub const DEFAULT_CLIENT_PORT: u16 = 30491;
/// Default port of the eventgroup endpoint.
pub const DEFAULT_EVENTGROUP_PORT: u16 = 30500;
