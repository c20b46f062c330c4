//! Licensing event stream protocol client.
//!
//! One [`Client`] owns one long-lived streaming connection and keeps it
//! alive forever: heartbeat-based liveness detection, exponential-backoff
//! reconnection, de-duplication of re-delivered events and recovery of
//! events missed while disconnected. Consumers read [`Signal`]s from the
//! [`SignalStream`] half.

mod backoff;
mod client;
mod dedup;
mod event;
mod frame;

pub use client::{Client, SignalStream};
pub use event::{EventKind, Signal, StreamEvent};
