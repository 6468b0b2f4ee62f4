//! Client configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use strest_client::ClientConfig;
//!
//! let config = ClientConfig::from_json(r#"{
//!     "url": "ws://localhost:8000/strest",
//!     "keepalive": true,
//!     "ping": "/ping",
//!     "ping_interval_ms": 10000
//! }"#)?;
//!
//! assert_eq!(config.ping.as_deref(), Some("/ping"));
//! assert_eq!(config.ping_interval, Duration::from_secs(10));
//! # Ok::<(), strest_client::Error>(())
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default interval between ping probes.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Default interval between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// URL scheme served by the built-in transport.
const SUPPORTED_SCHEME: &str = "ws";

// ============================================================================
// ClientConfig
// ============================================================================

/// Connection settings for a [`StrestClient`](crate::StrestClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server endpoint.
    pub url: Url,

    /// Reconnect after losing the connection, and run the ping probe.
    pub keepalive: bool,

    /// Resource probed while the connection is open. No probe when `None`.
    pub ping: Option<String>,

    /// Time between ping probes.
    pub ping_interval: Duration,

    /// Time between reconnect attempts.
    pub reconnect_interval: Duration,
}

/// On-disk form of [`ClientConfig`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    url: String,
    #[serde(default = "default_keepalive")]
    keepalive: bool,
    #[serde(default)]
    ping: Option<String>,
    #[serde(default)]
    ping_interval_ms: Option<u64>,
    #[serde(default)]
    reconnect_interval_ms: Option<u64>,
}

fn default_keepalive() -> bool {
    true
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            keepalive: default_keepalive(),
            ping: None,
            ping_interval: DEFAULT_PING_INTERVAL,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Omitted fields take their defaults. Intervals are in milliseconds.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document does not parse
    /// - [`Error::Url`] if `url` is not a valid URL
    /// - any error from [`validate`](Self::validate)
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)?;

        let mut config = Self::new(Url::parse(&raw.url)?);
        config.keepalive = raw.keepalive;
        config.ping = raw.ping;
        if let Some(ms) = raw.ping_interval_ms {
            config.ping_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = raw.reconnect_interval_ms {
            config.reconnect_interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientConfig {
    /// Enables or disables keepalive.
    #[inline]
    #[must_use]
    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Sets the ping probe resource.
    #[inline]
    #[must_use]
    pub fn with_ping(mut self, path: impl Into<String>) -> Self {
        self.ping = Some(path.into());
        self
    }

    /// Sets the ping interval.
    #[inline]
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Sets the reconnect interval.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientConfig {
    /// Checks the configuration for values the client cannot run with.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedTransport`] if the URL scheme is not `ws`
    /// - [`Error::Config`] if an interval is zero or the ping path is empty
    pub fn validate(&self) -> Result<()> {
        if self.url.scheme() != SUPPORTED_SCHEME {
            return Err(Error::unsupported_transport(self.url.scheme()));
        }
        if self.ping_interval.is_zero() {
            return Err(Error::config("Ping interval must be > 0"));
        }
        if self.reconnect_interval.is_zero() {
            return Err(Error::config("Reconnect interval must be > 0"));
        }
        if self.ping.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(Error::config("Ping path must not be empty"));
        }
        Ok(())
    }

    /// Returns `true` if the ping probe should run while open.
    #[inline]
    #[must_use]
    pub fn pings(&self) -> bool {
        self.keepalive && self.ping.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("ws://localhost:8000/strest").expect("valid url")
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(url());
        assert!(config.keepalive);
        assert!(config.ping.is_none());
        assert_eq!(config.ping_interval, DEFAULT_PING_INTERVAL);
        assert_eq!(config.reconnect_interval, DEFAULT_RECONNECT_INTERVAL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::new(url())
            .with_keepalive(false)
            .with_ping("/ping")
            .with_ping_interval(Duration::from_secs(1))
            .with_reconnect_interval(Duration::from_secs(2));

        assert!(!config.keepalive);
        assert_eq!(config.ping.as_deref(), Some("/ping"));
        assert_eq!(config.ping_interval, Duration::from_secs(1));
        assert_eq!(config.reconnect_interval, Duration::from_secs(2));
        assert!(!config.pings());
    }

    #[test]
    fn test_from_json_minimal() {
        let config = ClientConfig::from_json(r#"{"url": "ws://example.com/s"}"#).expect("parse");
        assert_eq!(config, ClientConfig::new(Url::parse("ws://example.com/s").expect("url")));
    }

    #[test]
    fn test_from_json_full() {
        let config = ClientConfig::from_json(
            r#"{
                "url": "ws://example.com/s",
                "keepalive": false,
                "ping": "/ping",
                "ping_interval_ms": 1500,
                "reconnect_interval_ms": 250
            }"#,
        )
        .expect("parse");

        assert!(!config.keepalive);
        assert_eq!(config.ping.as_deref(), Some("/ping"));
        assert_eq!(config.ping_interval, Duration::from_millis(1500));
        assert_eq!(config.reconnect_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(ClientConfig::from_json("{"), Err(Error::Json(_))));
        assert!(matches!(
            ClientConfig::from_json(r#"{"url": "not a url"}"#),
            Err(Error::Url(_))
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{"url": "ws://x", "bogus": 1}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unsupported_scheme() {
        for scheme in ["wss", "http"] {
            let config = ClientConfig::new(Url::parse(&format!("{scheme}://x/")).expect("url"));
            let err = config.validate().expect_err("unsupported");
            assert!(matches!(err, Error::UnsupportedTransport { scheme: ref s } if s == scheme));
        }
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let err = ClientConfig::new(url())
            .with_ping_interval(Duration::ZERO)
            .validate()
            .expect_err("zero ping");
        assert_eq!(err.to_string(), "Configuration error: Ping interval must be > 0");

        assert!(
            ClientConfig::new(url())
                .with_reconnect_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_rejects_blank_ping() {
        assert!(ClientConfig::new(url()).with_ping("  ").validate().is_err());
    }
}
