#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nrc_rmi::commands::*;
use nrc_rmi::drivers::{Connector, NrcDriverConfig, Transport};
use nrc_rmi::packets::{Command, CommandResponse};
use nrc_rmi::session::RobotSession;
use nrc_rmi::{NrcError, Pose, SessionState};
use tokio::sync::Notify;

pub const ABORTED: u32 = 1004;

/// In-memory controller that records every command it receives.
#[derive(Default)]
pub struct MockTransport {
    pub sent: Mutex<Vec<Command>>,
    disconnected: AtomicBool,
    /// ErrorID returned for a command name.
    errors: Mutex<HashMap<&'static str, u32>>,
    pub position: Mutex<Pose>,
    pub stall_positions: AtomicBool,
    pub clear_error_servo: AtomicU32,
    /// ServoStatus reported by NRC_GetStatus.
    pub status_servo: AtomicU32,
    hold_reads: AtomicBool,
    pub read_entered: Notify,
    read_gate: Notify,
    hold_motions: AtomicBool,
    gate: Notify,
    gate_error: AtomicU32,
    pub closes: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, command: &'static str, error_id: u32) {
        self.errors.lock().unwrap().insert(command, error_id);
    }

    pub fn succeed(&self, command: &'static str) {
        self.errors.lock().unwrap().remove(command);
    }

    pub fn drop_link(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    /// Motions block until `release` or a job stop.
    pub fn hold_motions(&self) {
        self.hold_motions.store(true, Ordering::SeqCst);
    }

    /// Position reads answer with the pose at request time, but only after
    /// `release_read`.
    pub fn hold_reads(&self) {
        self.hold_reads.store(true, Ordering::SeqCst);
    }

    pub fn release_read(&self) {
        self.hold_reads.store(false, Ordering::SeqCst);
        self.read_gate.notify_one();
    }

    pub fn release(&self, error_id: u32) {
        self.gate_error.store(error_id, Ordering::SeqCst);
        self.gate.notify_one();
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sent.lock().unwrap().iter().map(|c| c.name()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }

    pub fn exchanges(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, command: Command) -> Result<CommandResponse, NrcError> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(NrcError::ConnectionLost("mock link is down".to_string()));
        }
        self.sent.lock().unwrap().push(command.clone());
        let error_id = self
            .errors
            .lock()
            .unwrap()
            .get(command.name())
            .copied()
            .unwrap_or(0);

        match &command {
            Command::NrcGetStatus(cmd) => Ok(CommandResponse::NrcGetStatus(NrcGetStatusResponse {
                sequence_id: cmd.sequence_id,
                error_id,
                servo_status: self.status_servo.load(Ordering::SeqCst) as u8,
                speed: 100,
                coord: Default::default(),
                mode: Default::default(),
                tool_num: 0,
                user_num: 0,
            })),
            Command::NrcClearError(cmd) => Ok(CommandResponse::NrcClearError(NrcClearErrorResponse {
                sequence_id: cmd.sequence_id,
                error_id,
                servo_status: self.clear_error_servo.load(Ordering::SeqCst) as u8,
            })),
            Command::NrcReadPosition(cmd) => {
                if self.stall_positions.load(Ordering::SeqCst) {
                    std::future::pending::<()>().await;
                }
                let position = *self.position.lock().unwrap();
                if self.hold_reads.load(Ordering::SeqCst) {
                    self.read_entered.notify_one();
                    self.read_gate.notified().await;
                }
                Ok(CommandResponse::NrcReadPosition(NrcReadPositionResponse {
                    sequence_id: cmd.sequence_id,
                    error_id,
                    coord: cmd.coord,
                    position,
                }))
            }
            Command::NrcJobStop(_) => {
                if self.hold_motions.load(Ordering::SeqCst) {
                    self.release(ABORTED);
                }
                Ok(CommandResponse::ack_for(&command, error_id))
            }
            cmd if cmd.is_motion() => {
                if self.hold_motions.load(Ordering::SeqCst) {
                    self.gate.notified().await;
                    let gate_error = self.gate_error.load(Ordering::SeqCst);
                    return Ok(CommandResponse::ack_for(&command, gate_error));
                }
                if let Command::NrcMoveJ(m) | Command::NrcMoveL(m) = cmd {
                    if error_id == 0 {
                        *self.position.lock().unwrap() = m.motion.pos;
                    }
                }
                Ok(CommandResponse::ack_for(&command, error_id))
            }
            _ => Ok(CommandResponse::ack_for(&command, error_id)),
        }
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), NrcError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub const POSITION_TIMEOUT: Duration = Duration::from_millis(50);

pub async fn open_session(transport: &Arc<MockTransport>) -> RobotSession {
    RobotSession::open("arm1", transport.clone(), POSITION_TIMEOUT)
        .await
        .unwrap()
}

pub async fn powered_session(transport: &Arc<MockTransport>) -> RobotSession {
    let session = open_session(transport).await;
    session.set_servo_poweron().await.unwrap();
    assert_eq!(session.state().await, SessionState::PoweredOn);
    session
}

/// Polls until the session reaches `state`.
pub async fn wait_for_state(session: &RobotSession, state: SessionState) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while session.state().await != state {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("session never reached the expected state");
}

/// Hands out `MockTransport`s; optionally parks each connect until released.
#[derive(Default)]
pub struct MockConnector {
    pub transports: Mutex<Vec<Arc<MockTransport>>>,
    pub configs: Mutex<Vec<NrcDriverConfig>>,
    hold: AtomicBool,
    pub entered: Notify,
    gate: Notify,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hold_connects(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn last_transport(&self) -> Arc<MockTransport> {
        self.transports.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        config: &NrcDriverConfig,
        _robot_name: &str,
    ) -> Result<Arc<dyn Transport>, NrcError> {
        self.configs.lock().unwrap().push(config.clone());
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        let transport = MockTransport::new();
        self.transports.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}
