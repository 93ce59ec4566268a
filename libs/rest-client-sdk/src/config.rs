//! Per-request client configuration.
//!
//! A [`ClientConfig`] travels with every request as a typed attribute. The
//! connection handler reads it when it opens its transport and when it
//! decides how to encode a request entity.

use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Environment prefix used by [`ClientConfig::from_env`].
pub const ENV_PREFIX: &str = "REST_CLIENT_";

/// Transport and entity-encoding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ClientConfig {
    /// Connection establishment timeout, in milliseconds. `0` disables it.
    pub connect_timeout_ms: u64,
    /// Socket read timeout, in milliseconds. `0` disables it.
    pub read_timeout_ms: u64,
    pub follow_redirects: bool,
    pub proxy_host: Option<String>,
    pub proxy_port: u16,
    /// Upper bound of pooled connections per host. `0` keeps the engine default.
    pub max_pooled_connections: usize,
    /// Stream request entities instead of buffering them.
    pub chunked: bool,
    /// Accept TLS certificates whose subject does not match the host name.
    ///
    /// This is a security downgrade and must only be enabled against test
    /// servers. The handler logs a warning whenever a transport is created
    /// with this flag set.
    pub insecure_skip_hostname_verification: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 60_000,
            read_timeout_ms: 60_000,
            follow_redirects: true,
            proxy_host: None,
            proxy_port: 80,
            max_pooled_connections: 2000,
            chunked: true,
            insecure_skip_hostname_verification: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `REST_CLIENT_*` environment variables on top
    /// of the defaults.
    ///
    /// For example `REST_CLIENT_CHUNKED=false` or
    /// `REST_CLIENT_PROXY_HOST=proxy.local`.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] when a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ClientError> {
        Figment::from(Serialized::defaults(ClientConfig::default()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| ClientError::Config(e.to_string()))
    }

    #[must_use]
    pub fn with_chunked(mut self, chunked: bool) -> Self {
        self.chunked = chunked;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout_ms = duration_millis(connect);
        self.read_timeout_ms = duration_millis(read);
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy_host = Some(host.into());
        self.proxy_port = port;
        self
    }

    /// Opt in to skipping TLS hostname verification. See
    /// [`ClientConfig::insecure_skip_hostname_verification`].
    #[must_use]
    pub fn danger_skip_hostname_verification(mut self) -> Self {
        self.insecure_skip_hostname_verification = true;
        self
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.read_timeout_ms)
    }

    /// Proxy URL derived from host and port, if a proxy host is set.
    #[must_use]
    pub fn proxy_url(&self) -> Option<String> {
        self.proxy_host
            .as_deref()
            .filter(|host| !host.is_empty())
            .map(|host| format!("http://{host}:{}", self.proxy_port))
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
