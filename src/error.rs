//! crate error types

use snafu::prelude::*;

/// crate error type
///
/// Construction is the only fallible surface of this crate: once a client is
/// built, every runtime failure is retried and logged internally instead of
/// being surfaced to the caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    /// configuration rejected at construction
    #[snafu(display("invalid client configuration: {source}"))]
    InvalidConfig {
        /// source error
        source: crate::config::ConfigError,
    },

    /// create side-channel api client failed
    #[snafu(display("create api client failed: {source}"))]
    CreateAPIClient {
        /// source error
        source: crate::api::Error,
    },
}
