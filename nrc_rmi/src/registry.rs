//! Name-keyed ownership of robot sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::drivers::{Connector, NrcDriverConfig, TcpConnector};
use crate::session::RobotSession;
use crate::{NrcError, SessionState, StatusCode};

/// Defaults applied to every `connect`; address and port come from the call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RegistryConfig {
    pub driver: NrcDriverConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Connecting,
    Disconnecting,
}

/// Exclusive hold on a name while it is being created or removed.
struct NameClaim<'a> {
    claims: &'a StdMutex<HashMap<String, Claim>>,
    name: String,
}

impl Drop for NameClaim<'_> {
    fn drop(&mut self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

/// Owns every [`RobotSession`], keyed by robot name.
///
/// Lookups share a read lock. Connecting and disconnecting a name hold a claim
/// on that name only, so a slow handshake never blocks other robots.
pub struct SessionRegistry {
    config: RegistryConfig,
    connector: Arc<dyn Connector>,
    sessions: RwLock<HashMap<String, Arc<RobotSession>>>,
    claims: StdMutex<HashMap<String, Claim>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl SessionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    pub fn with_connector(config: RegistryConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            sessions: RwLock::new(HashMap::new()),
            claims: StdMutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn claims(&self) -> MutexGuard<'_, HashMap<String, Claim>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, name: &str, claim: Claim) -> Result<NameClaim<'_>, NrcError> {
        let mut claims = self.claims();
        if let Some(held) = claims.get(name) {
            return Err(NrcError::Busy(match held {
                Claim::Connecting => "robot is being connected",
                Claim::Disconnecting => "robot is being disconnected",
            }));
        }
        claims.insert(name.to_string(), claim);
        Ok(NameClaim {
            claims: &self.claims,
            name: name.to_string(),
        })
    }

    /// Opens a session for `name` at `ip:port`.
    ///
    /// `port` is the decimal string the C header passes. A live session under
    /// the same name yields [`NrcError::AlreadyConnected`]; a `Disconnected`
    /// tombstone is replaced.
    pub async fn connect(&self, name: &str, ip: &str, port: &str) -> Result<Arc<RobotSession>, NrcError> {
        if name.is_empty() {
            return Err(NrcError::InvalidArgument("robot name cannot be empty".to_string()));
        }
        if ip.is_empty() {
            return Err(NrcError::InvalidArgument("ip cannot be empty".to_string()));
        }
        let port = parse_port(port)?;

        let _claim = self.claim(name, Claim::Connecting)?;
        let existing = self.sessions.read().await.get(name).cloned();
        let tombstone = match existing {
            Some(session) => {
                if session.state().await != SessionState::Disconnected {
                    return Err(NrcError::AlreadyConnected(name.to_string()));
                }
                Some(session)
            }
            None => None,
        };

        let mut config = self.config.driver.clone();
        config.addr = ip.to_string();
        config.port = port;

        let transport = self.connector.connect(&config, name).await?;
        let session = match RobotSession::open(name, transport.clone(), config.position_timeout()).await {
            Ok(session) => Arc::new(session),
            Err(e) => {
                warn!(robot = name, "status sync failed after handshake: {}", e);
                let _ = transport.close().await;
                return Err(e);
            }
        };

        if let Some(old) = tombstone {
            let _ = old.close().await;
        }
        self.sessions
            .write()
            .await
            .insert(name.to_string(), session.clone());
        info!(robot = name, addr = %config.connection_url(), "robot connected");
        Ok(session)
    }

    /// Closes the transport and forgets `name`, whatever the servo state.
    pub async fn disconnect(&self, name: &str) -> Result<(), NrcError> {
        let _claim = self.claim(name, Claim::Disconnecting)?;
        let session = self
            .sessions
            .write()
            .await
            .remove(name)
            .ok_or_else(|| NrcError::NotFound(name.to_string()))?;
        if let Err(e) = session.close().await {
            warn!(robot = name, "transport did not close cleanly: {}", e);
        }
        info!(robot = name, "robot disconnected");
        Ok(())
    }

    pub async fn lookup(&self, name: &str) -> Result<Arc<RobotSession>, NrcError> {
        self.sessions
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| NrcError::NotFound(name.to_string()))
    }

    /// [`StatusCode::Connecting`] while `name` is mid-handshake, otherwise
    /// [`StatusCode::Ok`] for a live link.
    pub async fn connection_status(&self, name: &str) -> Result<StatusCode, NrcError> {
        if self.claims().get(name) == Some(&Claim::Connecting) {
            return Ok(StatusCode::Connecting);
        }
        self.lookup(name).await?.connection_status().await?;
        Ok(StatusCode::Ok)
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Disconnects every robot.
    pub async fn shutdown(&self) {
        let sessions: Vec<(String, Arc<RobotSession>)> =
            self.sessions.write().await.drain().collect();
        for (name, session) in sessions {
            if let Err(e) = session.close().await {
                warn!(robot = %name, "transport did not close cleanly: {}", e);
            }
        }
        info!("registry shut down");
    }
}

fn parse_port(port: &str) -> Result<u16, NrcError> {
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(NrcError::InvalidArgument(format!(
            "port must be 1..=65535, got `{port}`"
        ))),
        Ok(port) => Ok(port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_parsing() {
        assert_eq!(parse_port("6001"), Ok(6001));
        assert_eq!(parse_port(" 502 "), Ok(502));
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
        assert!(parse_port("abc").is_err());
    }
}
