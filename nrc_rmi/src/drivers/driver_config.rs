use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::time::Duration;

/// Link and timing policy for one controller connection.
///
/// ```rust,ignore
/// let config = NrcDriverConfig::new("192.168.1.10".to_string(), 6001);
///
/// if let Err(e) = config.validate() {
///     println!("Configuration error: {}", e);
///     return;
/// }
///
/// match config.resolve() {
///     Ok(resolved_address) => println!("Resolved address: {}", resolved_address),
///     Err(e) => println!("Failed to resolve address: {}", e),
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NrcDriverConfig {
    pub addr: String,
    pub port: u16,
    /// Attempts made before `connect` gives up.
    pub connect_retries: u32,
    pub retry_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
    /// Upper bound for one motion from request to arrival.
    pub motion_timeout_ms: u64,
    pub position_timeout_ms: u64,
}

impl NrcDriverConfig {
    pub fn new(addr: String, port: u16) -> Self {
        Self {
            addr,
            port,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.addr.is_empty() {
            return Err("Address cannot be empty.".to_string());
        }
        if self.port == 0 {
            return Err("Port number must be greater than 0.".to_string());
        }
        if self.connect_retries == 0 {
            return Err("At least one connection attempt is required.".to_string());
        }
        if self.connect_timeout_ms == 0
            || self.command_timeout_ms == 0
            || self.motion_timeout_ms == 0
            || self.position_timeout_ms == 0
        {
            return Err("Timeouts must be greater than 0.".to_string());
        }
        Ok(())
    }

    /// Generates a connection URL from the address and port.
    pub fn connection_url(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    /// Resolves the address to a `SocketAddr` if possible.
    ///
    /// Returns the resolved address as a `String`, or an error message if it cannot be resolved.
    pub fn resolve(&self) -> Result<String, String> {
        resolve_address(&self.addr, self.port)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn motion_timeout(&self) -> Duration {
        Duration::from_millis(self.motion_timeout_ms)
    }

    pub fn position_timeout(&self) -> Duration {
        Duration::from_millis(self.position_timeout_ms)
    }
}

impl Default for NrcDriverConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1".to_string(),
            port: 6001,
            connect_retries: 3,
            retry_delay_ms: 2000,
            connect_timeout_ms: 3000,
            command_timeout_ms: 2000,
            motion_timeout_ms: 60_000,
            position_timeout_ms: 500,
        }
    }
}

/// Resolves a DNS name or IP address to a `SocketAddr`.
fn resolve_address(addr: &str, port: u16) -> Result<String, String> {
    let address_with_port = format!("{}:{}", addr, port);
    match address_with_port.to_socket_addrs() {
        Ok(mut iter) => match iter.next() {
            Some(socket_addr) => Ok(socket_addr.to_string()),
            None => Err("Could not resolve address".to_string()),
        },
        Err(_) => Err("Invalid address format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = NrcDriverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection_url(), "127.0.0.1:6001");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: NrcDriverConfig =
            serde_json::from_str(r#"{"addr":"10.0.0.2","command_timeout_ms":100}"#).unwrap();
        assert_eq!(config.addr, "10.0.0.2");
        assert_eq!(config.port, 6001);
        assert_eq!(config.command_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = NrcDriverConfig {
            position_timeout_ms: 0,
            ..NrcDriverConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
