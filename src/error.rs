//! Errors that can occur when constructing service discovery objects.
//!
//! Runtime I/O trouble is deliberately absent here: sends are best-effort
//! (loss is permitted by the protocol) and receive timeouts are just the
//! absence of input, so neither propagates out of a tick. What can actually
//! fail is construction: binding the UDP socket, spawning the tick thread,
//! or handing a state machine a nonsensical configuration.

use std::io;

/// Why a service discovery object could not be created.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("invalid configuration: {reason}")]
  Config { reason: String },
}

pub type CreateResult<T> = Result<T, CreateError>;

pub(crate) fn config_error(reason: impl Into<String>) -> CreateError {
  CreateError::Config {
    reason: reason.into(),
  }
}
