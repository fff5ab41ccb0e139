use std::sync::Arc;

use async_trait::async_trait;

use super::{NrcDriver, NrcDriverConfig};
use crate::packets::{Command, CommandResponse};
use crate::NrcError;

/// One logical link to a controller.
///
/// `send` performs exactly one request/response exchange. Implementations must
/// bound every exchange in time and report link failures as
/// [`NrcError::ConnectionLost`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, command: Command) -> Result<CommandResponse, NrcError>;

    fn is_connected(&self) -> bool;

    /// Graceful close. Calling it on a dead link is not an error.
    async fn close(&self) -> Result<(), NrcError>;
}

/// Opens transports for the registry.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        config: &NrcDriverConfig,
        robot_name: &str,
    ) -> Result<Arc<dyn Transport>, NrcError>;
}

/// Production connector: TCP plus the `NRC_Connect` handshake.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(
        &self,
        config: &NrcDriverConfig,
        robot_name: &str,
    ) -> Result<Arc<dyn Transport>, NrcError> {
        let driver = NrcDriver::connect(config.clone(), robot_name).await?;
        Ok(Arc::new(driver))
    }
}
