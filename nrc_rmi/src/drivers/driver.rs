use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

pub use crate::packets::*;
use crate::NrcError;

use super::{NrcDriverConfig, Transport};

type Reply = Result<CommandResponse, NrcError>;

/// State shared between the driver handle and its reader task.
struct Shared {
    pending: StdMutex<HashMap<u32, oneshot::Sender<Reply>>>,
    disconnect_ack: StdMutex<Option<oneshot::Sender<()>>>,
    connected: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            pending: StdMutex::new(HashMap::new()),
            disconnect_ack: StdMutex::new(None),
            connected: AtomicBool::new(true),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<u32, oneshot::Sender<Reply>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn disconnect_ack(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.disconnect_ack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Flags the link dead and wakes every waiter with a closed channel.
    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.pending().clear();
        self.disconnect_ack().take();
    }

    fn deliver(&self, sequence_id: u32, reply: Reply) {
        match self.pending().remove(&sequence_id) {
            Some(waiter) => {
                let _ = waiter.send(reply);
            }
            None => debug!(sequence_id, "response without a waiter"),
        }
    }

    fn route(&self, line: &str) {
        match serde_json::from_str::<ResponsePacket>(line) {
            Ok(ResponsePacket::CommandResponse(response)) => {
                self.deliver(response.get_sequence_id(), Ok(response));
            }
            Ok(ResponsePacket::CommunicationResponse(CommunicationResponse::NrcDisconnect(_))) => {
                debug!("disconnect acknowledged");
                if let Some(ack) = self.disconnect_ack().take() {
                    let _ = ack.send(());
                }
            }
            Ok(ResponsePacket::CommunicationResponse(other)) => {
                debug!("ignoring communication packet: {:?}", other);
            }
            Err(e) => {
                warn!("unrecognized line from controller: {} ({})", line, e);
                // fail the matching waiter instead of letting it time out
                if let Some(sequence_id) = sequence_id_of(line) {
                    self.deliver(sequence_id, Err(NrcError::UnrecognizedPacket(line.to_string())));
                }
            }
        }
    }
}

fn sequence_id_of(line: &str) -> Option<u32> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let id = value.get("SequenceID")?.as_u64()?;
    u32::try_from(id).ok()
}

/// Removes a waiter from the pending map however `send` exits.
struct PendingGuard<'a> {
    shared: &'a Shared,
    sequence_id: u32,
}

impl<'a> PendingGuard<'a> {
    fn register(shared: &'a Shared, sequence_id: u32, waiter: oneshot::Sender<Reply>) -> Self {
        shared.pending().insert(sequence_id, waiter);
        Self {
            shared,
            sequence_id,
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.shared.pending().remove(&self.sequence_id);
    }
}

/// TCP transport to one NRC controller.
///
/// Requests are written under a write lock; a single reader task matches each
/// response line to its caller by `SequenceID`. That lets a `NRC_JobStop` go
/// out and come back while a motion request is still waiting for arrival.
pub struct NrcDriver {
    pub config: NrcDriverConfig,
    robot_name: String,
    controller_version: (u16, u16),
    next_sequence_id: AtomicU32,
    write_half: Mutex<OwnedWriteHalf>,
    shared: Arc<Shared>,
    reader: StdMutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for NrcDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NrcDriver")
            .field("robot_name", &self.robot_name)
            .field("addr", &self.config.connection_url())
            .field("controller_version", &self.controller_version)
            .field("connected", &self.shared.is_connected())
            .finish()
    }
}

impl NrcDriver {
    /// Opens the TCP link and performs the `NRC_Connect` handshake.
    ///
    /// # Errors
    ///
    /// * [`NrcError::InvalidArgument`] if the configuration does not validate.
    /// * [`NrcError::ConnectionLost`] if the controller cannot be reached within
    ///   `connect_retries` attempts, or does not answer the handshake in
    ///   `connect_timeout`.
    /// * [`NrcError::Controller`] if the controller refuses the robot name.
    /// * [`NrcError::Serialization`] / [`NrcError::UnrecognizedPacket`] for a
    ///   malformed handshake reply.
    pub async fn connect(config: NrcDriverConfig, robot_name: &str) -> Result<NrcDriver, NrcError> {
        config.validate().map_err(NrcError::InvalidArgument)?;
        let addr = config.connection_url();
        let mut stream = connect_with_retries(&addr, &config).await?;

        let packet = SendPacket::Communication(Communication::NrcConnect(NrcConnect {
            robot_name: robot_name.to_string(),
        }));
        let line = packet.to_line()?;
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| NrcError::ConnectionLost(format!("failed to send handshake: {e}")))?;

        let mut buffer = Vec::new();
        let reply = timeout(config.connect_timeout(), read_line(&mut stream, &mut buffer))
            .await
            .map_err(|_| {
                NrcError::ConnectionLost(format!(
                    "no handshake reply from {addr} within {:?}",
                    config.connect_timeout()
                ))
            })??;
        debug!("Sent: {}Received: {}", line, reply);

        let controller_version = match serde_json::from_str::<CommunicationResponse>(&reply)? {
            CommunicationResponse::NrcConnect(resp) => {
                if resp.error_id != 0 {
                    return Err(NrcError::from_error_id(resp.error_id));
                }
                (resp.major_version, resp.minor_version)
            }
            other => {
                return Err(NrcError::UnrecognizedPacket(format!(
                    "expected NRC_Connect reply, got {other:?}"
                )))
            }
        };
        info!(
            robot = robot_name,
            %addr,
            "connected to controller v{}.{}",
            controller_version.0,
            controller_version.1
        );

        let (read_half, write_half) = stream.into_split();
        let shared = Arc::new(Shared::new());
        let reader = tokio::spawn(read_responses(
            read_half,
            buffer,
            shared.clone(),
            robot_name.to_string(),
        ));

        Ok(Self {
            config,
            robot_name: robot_name.to_string(),
            controller_version,
            next_sequence_id: AtomicU32::new(1),
            write_half: Mutex::new(write_half),
            shared,
            reader: StdMutex::new(Some(reader)),
        })
    }

    async fn write_packet(&self, packet: &SendPacket) -> Result<(), NrcError> {
        let line = packet.to_line()?;
        let mut writer = self.write_half.lock().await;
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            drop(writer);
            self.drop_link();
            return Err(NrcError::ConnectionLost(format!("failed to send: {e}")));
        }
        debug!(robot = %self.robot_name, "Sent: {}", line.trim_end());
        Ok(())
    }

    fn drop_link(&self) {
        self.shared.mark_disconnected();
        let handle = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for NrcDriver {
    fn drop(&mut self) {
        self.drop_link();
    }
}

#[async_trait]
impl Transport for NrcDriver {
    async fn send(&self, mut command: Command) -> Result<CommandResponse, NrcError> {
        if !self.is_connected() {
            return Err(NrcError::ConnectionLost(format!(
                "link to {} is closed",
                self.robot_name
            )));
        }

        let sequence_id = self.next_sequence_id.fetch_add(1, Ordering::Relaxed);
        command.set_sequence_id(sequence_id);
        let name = command.name();
        let limit = if command.is_motion() {
            self.config.motion_timeout()
        } else {
            self.config.command_timeout()
        };

        let (waiter, reply) = oneshot::channel();
        let _pending = PendingGuard::register(&self.shared, sequence_id, waiter);
        // the reader may have died between the check above and the insert
        if !self.is_connected() {
            return Err(NrcError::ConnectionLost(format!(
                "link to {} is closed",
                self.robot_name
            )));
        }

        self.write_packet(&SendPacket::Command(command)).await?;

        match timeout(limit, reply).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(NrcError::ConnectionLost(format!(
                "link closed while waiting for {name} #{sequence_id}"
            ))),
            Err(_) => {
                warn!(robot = %self.robot_name, sequence_id, "{} timed out after {:?}", name, limit);
                self.drop_link();
                Err(NrcError::ConnectionLost(format!(
                    "no {name} response within {limit:?}"
                )))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    async fn close(&self) -> Result<(), NrcError> {
        if self.is_connected() {
            let (ack, acked) = oneshot::channel();
            *self.shared.disconnect_ack() = Some(ack);
            let sent = self
                .write_packet(&SendPacket::Communication(Communication::NrcDisconnect))
                .await;
            if sent.is_ok() && timeout(self.config.command_timeout(), acked).await.is_err() {
                warn!(robot = %self.robot_name, "NRC_Disconnect was not acknowledged");
            }
        }
        self.drop_link();
        let _ = self.write_half.lock().await.shutdown().await;
        info!(robot = %self.robot_name, "Disconnected from controller");
        Ok(())
    }
}

async fn read_responses(
    mut reader: OwnedReadHalf,
    mut buffer: Vec<u8>,
    shared: Arc<Shared>,
    robot_name: String,
) {
    loop {
        match read_line(&mut reader, &mut buffer).await {
            Ok(line) => {
                debug!(robot = %robot_name, "received: {}", line);
                shared.route(&line);
            }
            Err(e) => {
                if shared.is_connected() {
                    warn!(robot = %robot_name, "link dropped: {}", e);
                }
                break;
            }
        }
    }
    shared.mark_disconnected();
}

async fn connect_with_retries(addr: &str, config: &NrcDriverConfig) -> Result<TcpStream, NrcError> {
    let retries = config.connect_retries.max(1);
    let mut last_error = String::new();
    for attempt in 0..retries {
        match timeout(config.connect_timeout(), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => return Ok(stream),
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => last_error = format!("timed out after {:?}", config.connect_timeout()),
        }
        warn!("Failed to connect to {} (attempt {}): {}", addr, attempt + 1, last_error);
        if attempt + 1 < retries {
            sleep(config.retry_delay()).await;
        }
    }
    Err(NrcError::ConnectionLost(format!(
        "could not reach {addr}: {last_error}"
    )))
}

/// Longest reply line accepted before the link is treated as broken.
const MAX_LINE_LEN: usize = 64 * 1024;

/// Reads until one non-empty line is buffered and returns it.
async fn read_line<R: AsyncRead + Unpin>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
) -> Result<String, NrcError> {
    let mut chunk = [0u8; 2048];
    loop {
        while let Some(line) = take_line(buffer) {
            if !line.is_empty() {
                return Ok(line);
            }
        }
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| NrcError::ConnectionLost(e.to_string()))?;
        if n == 0 {
            return Err(NrcError::ConnectionLost(
                "controller closed the connection".to_string(),
            ));
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() > MAX_LINE_LEN && !buffer.contains(&b'\n') {
            return Err(NrcError::ConnectionLost(format!(
                "controller sent more than {MAX_LINE_LEN} bytes without a line break"
            )));
        }
    }
}

/// Pops one `\n`-terminated line off the front of `buffer`, minus its `\r\n`.
fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let mut chunk = buffer.drain(..=pos).collect::<Vec<_>>();
    chunk.pop();
    if chunk.last() == Some(&b'\r') {
        chunk.pop();
    }
    Some(String::from_utf8_lossy(&chunk).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_line_strips_terminator_and_keeps_remainder() {
        let mut buffer = b"{\"a\":1}\r\n{\"b\"".to_vec();
        assert_eq!(take_line(&mut buffer).as_deref(), Some("{\"a\":1}"));
        assert_eq!(take_line(&mut buffer), None);
        assert_eq!(buffer, b"{\"b\"".to_vec());
    }

    #[test]
    fn sequence_id_is_recovered_from_unknown_frames() {
        assert_eq!(
            sequence_id_of(r#"{"Command":"NRC_Bogus","SequenceID":12,"ErrorID":0}"#),
            Some(12)
        );
        assert_eq!(sequence_id_of("not json"), None);
    }

    #[tokio::test]
    async fn read_line_skips_blank_lines() {
        let mut input: &[u8] = b"\r\n\r\nhello\r\n";
        let mut buffer = Vec::new();
        assert_eq!(read_line(&mut input, &mut buffer).await.unwrap(), "hello");
        assert!(read_line(&mut input, &mut buffer).await.unwrap_err().is_connection_lost());
    }

    #[tokio::test]
    async fn read_line_rejects_unterminated_flood() {
        let flood = vec![b'x'; MAX_LINE_LEN + 4096];
        let mut input: &[u8] = &flood;
        let mut buffer = Vec::new();
        let err = read_line(&mut input, &mut buffer).await.unwrap_err();
        assert!(err.is_connection_lost(), "{err:?}");
        assert!(buffer.len() <= MAX_LINE_LEN + 2048);
    }
}
