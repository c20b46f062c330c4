//! Client configuration.

use std::time::Duration;

use snafu::prelude::*;

/// default heartbeat timeout, twice the server's 30s heartbeat cadence
pub(crate) const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);

/// default dedup window, also the sweep interval of the seen-id map
pub(crate) const DEDUP_WINDOW: Duration = Duration::from_secs(5 * 60);

/// default first reconnect delay
pub(crate) const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// default reconnect delay cap
pub(crate) const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(5 * 60);

/// default reconnect delay growth factor
pub(crate) const BACKOFF_MULTIPLIER: u32 = 2;

/// default terminal session keep-alive interval
pub(crate) const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Error when validating a [`Config`]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(variant), context(suffix(false)))]
pub enum ConfigError {
    /// license key is empty
    #[snafu(display("license key is empty"))]
    EmptyLicenseKey,

    /// machine fingerprint hash is empty
    #[snafu(display("machine fingerprint hash is empty"))]
    EmptyMachineId,

    /// api base url is not a valid url
    #[snafu(display("{url} is not a valid api base url: {source}"))]
    InvalidBaseURL {
        /// input url
        url: String,
        /// source error
        source: url::ParseError,
    },

    /// api base url is not an http(s) url
    #[snafu(display("api base url {url} has invalid schema {schema}, only http or https is ok"))]
    InvalidBaseURLSchema {
        /// input url
        url: String,
        /// invalid schema
        schema: String,
    },

    /// a timing field is zero
    #[snafu(display("{field} must be greater than zero"))]
    ZeroDuration {
        /// offending field
        field: &'static str,
    },

    /// backoff range is inverted
    #[snafu(display("max reconnect delay is smaller than the initial reconnect delay"))]
    BackoffRangeInverted,

    /// backoff multiplier below one would shrink the delay
    #[snafu(display("backoff multiplier {multiplier} is less than 1"))]
    MultiplierTooSmall {
        /// input multiplier
        multiplier: u32,
    },
}

/// Configuration of one event stream client.
///
/// The identity fields (license key, machine fingerprint hash, api base url)
/// come from the host terminal; the timing fields default to the protocol
/// constants and are normally left alone.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) license_key: String,
    pub(crate) machine_id: String,
    pub(crate) base_url: url::Url,

    pub(crate) heartbeat_timeout: Duration,
    pub(crate) dedup_window: Duration,
    pub(crate) initial_reconnect_delay: Duration,
    pub(crate) max_reconnect_delay: Duration,
    pub(crate) backoff_multiplier: u32,
    pub(crate) keep_alive_interval: Duration,
}

impl Config {
    /// Create a configuration from the terminal's identity.
    ///
    /// The license key is upper-cased before use. The machine fingerprint
    /// hash is an opaque string produced by the fingerprint generator and is
    /// used as-is.
    pub fn new(license_key: &str, machine_id: &str, base_url: &str) -> crate::Result<Self> {
        Self::build(license_key, machine_id, base_url).context(crate::error::InvalidConfig)
    }

    fn build(license_key: &str, machine_id: &str, base_url: &str) -> Result<Self, ConfigError> {
        ensure!(!license_key.trim().is_empty(), variant::EmptyLicenseKey);
        ensure!(!machine_id.trim().is_empty(), variant::EmptyMachineId);

        let base_url = url::Url::parse(base_url)
            .with_context(|_| variant::InvalidBaseURL { url: base_url })?;

        ensure!(
            base_url.scheme() == "http" || base_url.scheme() == "https",
            variant::InvalidBaseURLSchema {
                url: base_url.as_str(),
                schema: base_url.scheme(),
            }
        );

        Ok(Self {
            license_key: license_key.trim().to_uppercase(),
            machine_id: machine_id.trim().to_string(),
            base_url,
            heartbeat_timeout: HEARTBEAT_TIMEOUT,
            dedup_window: DEDUP_WINDOW,
            initial_reconnect_delay: INITIAL_RECONNECT_DELAY,
            max_reconnect_delay: MAX_RECONNECT_DELAY,
            backoff_multiplier: BACKOFF_MULTIPLIER,
            keep_alive_interval: KEEP_ALIVE_INTERVAL,
        })
    }

    /// Override the heartbeat timeout (default 60 seconds).
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Override the dedup window and sweep interval (default 5 minutes).
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    /// Override the first reconnect delay (default 1 second).
    pub fn with_initial_reconnect_delay(mut self, delay: Duration) -> Self {
        self.initial_reconnect_delay = delay;
        self
    }

    /// Override the reconnect delay cap (default 5 minutes).
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = delay;
        self
    }

    /// Override the reconnect delay growth factor (default 2).
    pub fn with_backoff_multiplier(mut self, multiplier: u32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Override the terminal session keep-alive interval (default 2 minutes).
    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    /// Timing overrides are only checked when the client is built.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("heartbeat timeout", self.heartbeat_timeout),
            ("dedup window", self.dedup_window),
            ("initial reconnect delay", self.initial_reconnect_delay),
            ("max reconnect delay", self.max_reconnect_delay),
            ("keep-alive interval", self.keep_alive_interval),
        ] {
            ensure!(!value.is_zero(), variant::ZeroDuration { field });
        }

        ensure!(
            self.max_reconnect_delay >= self.initial_reconnect_delay,
            variant::BackoffRangeInverted
        );

        ensure!(
            self.backoff_multiplier >= 1,
            variant::MultiplierTooSmall {
                multiplier: self.backoff_multiplier,
            }
        );

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_license_key_is_uppercased() {
        let config = Config::new("pos-1234-abcd", "hash", "https://api.till.example").unwrap();
        assert_eq!(config.license_key, "POS-1234-ABCD");
    }

    #[test]
    fn test_empty_license_key_rejected() {
        assert!(Config::new("  ", "hash", "https://api.till.example").is_err());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(Config::new("key", "hash", "not a url").is_err());
        assert!(Config::new("key", "hash", "ftp://api.till.example").is_err());
    }

    #[test]
    fn test_timing_overrides_validated() {
        let config = Config::new("key", "hash", "https://api.till.example")
            .unwrap()
            .with_heartbeat_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = Config::new("key", "hash", "https://api.till.example")
            .unwrap()
            .with_initial_reconnect_delay(Duration::from_secs(10))
            .with_max_reconnect_delay(Duration::from_secs(1));
        assert!(config.validate().is_err());

        let config = Config::new("key", "hash", "https://api.till.example").unwrap();
        assert!(config.validate().is_ok());
    }
}
