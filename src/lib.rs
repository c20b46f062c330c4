//! # Tillstream
//!
//! Licensing event stream client for the Till point-of-sale terminal.
//!
//! The terminal keeps one long-lived HTTP connection open to the licensing
//! server and receives pushed subscription/license events over it. This crate
//! owns that connection: framing, heartbeat liveness, de-duplication,
//! exponential-backoff reconnection, missed-event recovery and best-effort
//! delivery acknowledgment. Consumers either read [`Signal`](stream::Signal)s
//! from the raw [`stream::Client`], or register [`Subscriber`]s on a
//! [`Monitor`] and let it dispatch events for them.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations, missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod filter;
pub mod stream;

mod config;
mod error;
mod monitor;
mod subscriber;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use monitor::Monitor;
pub use subscriber::Subscriber;

/// crate result type
pub type Result<T> = std::result::Result<T, Error>;
