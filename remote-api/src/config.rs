use std::fmt::{Debug, Formatter};
use std::time::Duration;

use remote_api_core::utils::Redact;
use remote_api_core::{Error, Result};
use serde::Deserialize;

/// Configuration of one remote platform.
///
/// Timeouts are given in seconds and may be fractional.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformConfig {
    /// App key, requests are signed only when the secret is set too.
    pub app_key: Option<String>,
    /// App secret.
    pub app_secret: Option<String>,
    /// Signature validity in seconds, 60 by default.
    pub ttl: Option<u64>,
    /// Base uri relative call paths resolve against.
    pub base_uri: Option<String>,
    /// Whole request timeout.
    pub timeout: Option<f64>,
    /// Connection phase timeout.
    pub connect_timeout: Option<f64>,
}

impl PlatformConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base_uri
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Set app_key and app_secret
    pub fn with_app_key(
        mut self,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        self.app_key = Some(app_key.into());
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Set ttl in seconds
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set connect_timeout in seconds
    pub fn with_connect_timeout(mut self, connect_timeout: f64) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    /// Parsed whole request timeout.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        seconds("timeout", self.timeout)
    }

    /// Parsed connection timeout.
    pub fn connect_timeout(&self) -> Result<Option<Duration>> {
        seconds("connect_timeout", self.connect_timeout)
    }
}

fn seconds(name: &str, v: Option<f64>) -> Result<Option<Duration>> {
    v.map(|secs| {
        Duration::try_from_secs_f64(secs).map_err(|e| {
            Error::config_invalid(format!(
                "{name} must be a non-negative number of seconds, got {secs}"
            ))
            .with_source(e)
        })
    })
    .transpose()
}

impl Debug for PlatformConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("app_key", &Redact::from(&self.app_key))
            .field("app_secret", &Redact::from(&self.app_secret))
            .field("ttl", &self.ttl)
            .field("base_uri", &self.base_uri)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
