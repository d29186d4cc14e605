//! Connection configuration.
//!
//! [`RconConfig`] carries the target address, the password and the timeout
//! applied to the connect and authentication phases. Validation happens in
//! [`RconClient::new`](crate::RconClient::new), before any I/O.

use std::time::Duration;

use crate::error::{RconError, Result};

/// Default RCON port used by Minecraft servers.
pub const DEFAULT_RCON_PORT: u16 = 25575;

/// Default connect/authentication timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Configuration for an RCON connection.
///
/// Use the fluent API to override the defaults:
///
/// ```
/// use std::time::Duration;
/// use rcon_client::RconConfig;
///
/// let config = RconConfig::new("play.example.org", "hunter2")
///     .port(32275)
///     .timeout(Duration::from_secs(10));
/// assert_eq!(config.port, 32275);
/// ```
#[derive(Debug, Clone)]
pub struct RconConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server RCON port.
    pub port: u16,
    /// RCON password sent during the handshake.
    pub password: String,
    /// Deadline for the connect phase and the authentication phase.
    pub timeout: Duration,
}

impl RconConfig {
    /// Create a configuration with the default port and timeout.
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_RCON_PORT,
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect/authentication timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the configuration shape.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(RconError::InvalidArgument(
                "host must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(RconError::InvalidArgument(
                "port must be in 1..=65535".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(RconError::InvalidArgument(
                "timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RconConfig::new("localhost", "secret");
        assert_eq!(config.port, DEFAULT_RCON_PORT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fluent_overrides() {
        let config = RconConfig::new("localhost", "secret")
            .port(1234)
            .timeout(Duration::from_secs(1));
        assert_eq!(config.port, 1234);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_empty_host_rejected() {
        let config = RconConfig::new("", "secret");
        assert!(matches!(
            config.validate(),
            Err(RconError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_port_zero_rejected() {
        let config = RconConfig::new("localhost", "secret").port(0);
        assert!(matches!(
            config.validate(),
            Err(RconError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = RconConfig::new("localhost", "secret").timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(RconError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_password_allowed() {
        // Some servers run with an empty rcon.password; the server decides.
        let config = RconConfig::new("localhost", "");
        assert!(config.validate().is_ok());
    }
}
