//! Configuration for SignedRequest services.
//!
//! Provides [`SignedRequestConfig`]. Configuration values are loaded from
//! environment variables; unset or unparsable variables fall back to defaults.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{CoreError, CoreResult};

/// Service configuration for a signed-request verifier.
///
/// # Examples
///
/// ```
/// use signedrequest_core::SignedRequestConfig;
///
/// let config = SignedRequestConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8787");
/// assert_eq!(config.certificate_cache_ttl_secs, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SignedRequestConfig {
    /// Bind address for the gateway (e.g. `"0.0.0.0:8787"`).
    #[builder(default = String::from("0.0.0.0:8787"))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Directory holding the currently valid public certificates (`*.pem`).
    #[builder(default = String::from("/etc/signedrequest/certs"))]
    pub certificate_dir: String,

    /// How long a fetched certificate set may be reused, in seconds.
    /// Zero re-reads the certificate directory on every verification.
    #[builder(default = 0)]
    pub certificate_cache_ttl_secs: u64,
}

impl Default for SignedRequestConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8787"),
            log_level: String::from("info"),
            certificate_dir: String::from("/etc/signedrequest/certs"),
            certificate_cache_ttl_secs: 0,
        }
    }
}

impl SignedRequestConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8787` |
    /// | `LOG_LEVEL` | `info` |
    /// | `CERTIFICATE_DIR` | `/etc/signedrequest/certs` |
    /// | `CERTIFICATE_CACHE_TTL_SECS` | `0` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("CERTIFICATE_DIR") {
            config.certificate_dir = v;
        }
        if let Ok(v) = std::env::var("CERTIFICATE_CACHE_TTL_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.certificate_cache_ttl_secs = n;
            }
        }

        config
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the listen address or certificate
    /// directory is empty.
    pub fn validate(&self) -> CoreResult<()> {
        if self.gateway_listen.trim().is_empty() {
            return Err(CoreError::Config("GATEWAY_LISTEN must not be empty".to_owned()));
        }
        if self.certificate_dir.trim().is_empty() {
            return Err(CoreError::Config("CERTIFICATE_DIR must not be empty".to_owned()));
        }
        Ok(())
    }
}
