//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`StrestClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use strest_client::StrestClient;
//!
//! # async fn example() -> strest_client::Result<()> {
//! let client = StrestClient::builder()
//!     .url("ws://localhost:8000/strest")
//!     .ping("/ping")
//!     .ping_interval(Duration::from_secs(10))
//!     .on_close(|reason| eprintln!("lost connection: {reason}"))
//!     .build()?;
//!
//! client.connect();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::TxnIdGenerator;
use crate::transport::{Transport, WebSocketTransport};

use super::config::ClientConfig;
use super::core::{ClientParts, CloseCallback, OpenCallback, StrestClient};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`StrestClient`].
///
/// Use [`StrestClient::builder()`] to create a new builder.
#[derive(Default)]
pub struct ClientBuilder {
    /// Server endpoint, parsed on build.
    url: Option<String>,
    keepalive: Option<bool>,
    ping: Option<String>,
    ping_interval: Option<Duration>,
    reconnect_interval: Option<Duration>,
    on_open: Option<OpenCallback>,
    on_close: Option<CloseCallback>,
    /// Defaults to [`WebSocketTransport`].
    transport: Option<Box<dyn Transport>>,
    ids: Option<TxnIdGenerator>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server endpoint, e.g. `ws://localhost:8000/strest`.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Takes every setting from an existing configuration.
    ///
    /// Later builder calls override individual settings.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.url = Some(config.url.into());
        self.keepalive = Some(config.keepalive);
        self.ping = config.ping;
        self.ping_interval = Some(config.ping_interval);
        self.reconnect_interval = Some(config.reconnect_interval);
        self
    }

    /// Enables or disables reconnecting and the ping probe.
    ///
    /// Enabled by default.
    #[inline]
    #[must_use]
    pub fn keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = Some(keepalive);
        self
    }

    /// Sets the resource requested periodically while connected.
    #[inline]
    #[must_use]
    pub fn ping(mut self, path: impl Into<String>) -> Self {
        self.ping = Some(path.into());
        self
    }

    /// Sets the time between ping probes.
    #[inline]
    #[must_use]
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = Some(interval);
        self
    }

    /// Sets the time between reconnect attempts.
    #[inline]
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = Some(interval);
        self
    }

    /// Sets the callback invoked each time the connection opens.
    #[must_use]
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(f));
        self
    }

    /// Sets the callback invoked with the reason each time the connection
    /// closes.
    #[must_use]
    pub fn on_close(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    /// Replaces the WebSocket transport.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Uses a shared transaction id sequence.
    ///
    /// Clients built with clones of one generator never reuse each other's
    /// ids.
    #[inline]
    #[must_use]
    pub fn ids(mut self, ids: TxnIdGenerator) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Builds the client and starts its event loop.
    ///
    /// The client does not connect until [`StrestClient::connect`] is called.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no URL is set or called outside a tokio runtime
    /// - [`Error::Url`] if the URL does not parse
    /// - any error from [`ClientConfig::validate`]
    pub fn build(self) -> Result<StrestClient> {
        let config = self.resolve_config()?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::config(
                "StrestClient must be built inside a tokio runtime",
            ));
        }

        Ok(StrestClient::new(ClientParts {
            config,
            transport: self
                .transport
                .unwrap_or_else(|| Box::new(WebSocketTransport)),
            on_open: self.on_open,
            on_close: self.on_close,
            ids: self.ids.unwrap_or_default(),
        }))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Assembles and validates the configuration.
    fn resolve_config(&self) -> Result<ClientConfig> {
        let url = self.url.as_deref().ok_or_else(|| {
            Error::config(
                "Server URL is required. Use .url() to set it.\n\
                 Example: StrestClient::builder().url(\"ws://localhost:8000/strest\")",
            )
        })?;

        let mut config = ClientConfig::new(Url::parse(url)?);
        if let Some(keepalive) = self.keepalive {
            config.keepalive = keepalive;
        }
        config.ping = self.ping.clone();
        if let Some(interval) = self.ping_interval {
            config.ping_interval = interval;
        }
        if let Some(interval) = self.reconnect_interval {
            config.reconnect_interval = interval;
        }

        config.validate()?;
        Ok(config)
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("url", &self.url)
            .field("keepalive", &self.keepalive)
            .field("ping", &self.ping)
            .field("ping_interval", &self.ping_interval)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::client::ConnectionState;
    use crate::identifiers::TxnId;
    use crate::transport::mock::MockTransport;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ClientBuilder::new();
        assert!(builder.url.is_none());
        assert!(builder.keepalive.is_none());
        assert!(builder.transport.is_none());
    }

    #[test]
    fn test_setters_record_values() {
        let builder = ClientBuilder::new()
            .url("ws://localhost/s")
            .keepalive(false)
            .ping("/ping")
            .ping_interval(Duration::from_secs(1))
            .reconnect_interval(Duration::from_secs(2));

        let config = builder.resolve_config().expect("valid");
        assert!(!config.keepalive);
        assert_eq!(config.ping.as_deref(), Some("/ping"));
        assert_eq!(config.ping_interval, Duration::from_secs(1));
        assert_eq!(config.reconnect_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_config_then_override() {
        let base = ClientConfig::new(Url::parse("ws://localhost/s").expect("url"))
            .with_ping("/ping")
            .with_keepalive(false);

        let config = ClientBuilder::new()
            .config(base)
            .keepalive(true)
            .resolve_config()
            .expect("valid");

        assert!(config.keepalive);
        assert_eq!(config.ping.as_deref(), Some("/ping"));
    }

    #[test]
    fn test_build_fails_without_url() {
        let err = ClientBuilder::new().build().expect_err("no url");
        assert!(err.to_string().contains("URL"));
    }

    #[test]
    fn test_build_fails_with_bad_url() {
        let err = ClientBuilder::new().url("not a url").build().expect_err("bad url");
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_build_fails_with_unsupported_scheme() {
        let err = ClientBuilder::new()
            .url("http://localhost/s")
            .build()
            .expect_err("http");
        assert!(matches!(err, Error::UnsupportedTransport { .. }));
    }

    #[test]
    fn test_build_fails_outside_runtime() {
        let err = ClientBuilder::new()
            .url("ws://localhost/s")
            .build()
            .expect_err("no runtime");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_build_starts_disconnected() {
        let client = ClientBuilder::new()
            .url("ws://localhost/s")
            .transport(MockTransport::default())
            .build()
            .expect("build");

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.url().as_str(), "ws://localhost/s");
        assert!(client.config().keepalive);
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_shared_id_generator() {
        let ids = TxnIdGenerator::starting_at(7);
        let mock = MockTransport::default();
        let client = ClientBuilder::new()
            .url("ws://localhost/s")
            .keepalive(false)
            .transport(mock.clone())
            .ids(ids.clone())
            .build()
            .expect("build");

        client.connect();
        mock.last().events.opened();
        client.settle().await;

        let request = client
            .send_request("/a", Default::default())
            .expect("send");
        assert_eq!(request.txn_id(), Some(TxnId::new(7)));
        assert_eq!(ids.peek(), TxnId::new(8));
    }
}
