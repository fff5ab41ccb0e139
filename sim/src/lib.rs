//! Simulated NRC controller.
//!
//! Listens for the JSON line protocol, accepts one client at a time and answers
//! every command the way the controller does, including long-running motions
//! that can be preempted by `NRC_JobStop`.

pub mod robot_config;

pub use robot_config::RobotConfig;

use std::collections::BTreeSet;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use nrc_rmi::commands::*;
use nrc_rmi::packets::*;
use nrc_rmi::{ControllerErrorCode, CoordFrame, Pose, RobotMode, ServoStatus};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

type BoxError = Box<dyn Error + Send + Sync>;
type Writer = Arc<Mutex<OwnedWriteHalf>>;
type SharedState = Arc<Mutex<ControllerState>>;

#[derive(Debug)]
struct ActiveMotion {
    command: Command,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct ControllerState {
    config: RobotConfig,
    servo: ServoStatus,
    speed: u8,
    coord: CoordFrame,
    mode: RobotMode,
    tool_num: u8,
    user_num: u8,
    positions: [Pose; 4],
    jogging: BTreeSet<u8>,
    motion: Option<ActiveMotion>,
    client: Option<String>,
    received: Vec<&'static str>,
}

impl ControllerState {
    fn new(config: RobotConfig) -> Self {
        let cartesian = config.initial_cartesian;
        Self {
            servo: ServoStatus::Stop,
            speed: 100,
            coord: CoordFrame::Joint,
            mode: RobotMode::Teach,
            tool_num: 0,
            user_num: 0,
            positions: [config.home, cartesian, cartesian, cartesian],
            jogging: BTreeSet::new(),
            motion: None,
            client: None,
            received: Vec::new(),
            config,
        }
    }

    fn is_busy(&self) -> bool {
        self.motion.is_some() || !self.jogging.is_empty()
    }

    fn status(&self, sequence_id: u32) -> NrcGetStatusResponse {
        NrcGetStatusResponse {
            sequence_id,
            error_id: 0,
            servo_status: u8::from(self.servo),
            speed: self.speed,
            coord: self.coord,
            mode: self.mode,
            tool_num: self.tool_num,
            user_num: self.user_num,
        }
    }

    fn set_power(&mut self, command: &Command, on: bool) -> CommandResponse {
        let error = if self.is_busy() {
            ControllerErrorCode::ControllerBusy.id()
        } else if on && self.servo == ServoStatus::Error {
            ControllerErrorCode::InvalidControllerState.id()
        } else {
            self.servo = if on { ServoStatus::Ok } else { ServoStatus::Stop };
            0
        };
        CommandResponse::ack_for(command, error)
    }

    fn configure(&mut self, command: &Command, apply: impl FnOnce(&mut Self)) -> CommandResponse {
        if self.is_busy() {
            return CommandResponse::ack_for(command, ControllerErrorCode::ControllerBusy.id());
        }
        apply(self);
        CommandResponse::ack_for(command, 0)
    }

    fn start_jog(&mut self, command: &Command, axis: u8) -> CommandResponse {
        let jogging = self.servo == ServoStatus::Running && !self.jogging.is_empty();
        let error = if self.motion.is_some() {
            ControllerErrorCode::ControllerBusy.id()
        } else if self.servo != ServoStatus::Ok && !jogging {
            ControllerErrorCode::ServoOff.id()
        } else {
            self.jogging.insert(axis);
            self.servo = ServoStatus::Running;
            0
        };
        CommandResponse::ack_for(command, error)
    }

    fn stop_jog(&mut self, command: &Command, axis: u8) -> CommandResponse {
        self.jogging.remove(&axis);
        if self.jogging.is_empty() && self.motion.is_none() && self.servo == ServoStatus::Running {
            self.servo = ServoStatus::Ok;
        }
        CommandResponse::ack_for(command, 0)
    }

    /// Aborts the active motion (answered with `MotionAborted`) and drops the drives.
    fn job_stop(&mut self, command: &Command) -> Vec<CommandResponse> {
        let mut responses = Vec::new();
        if let Some(motion) = self.motion.take() {
            motion.task.abort();
            debug!(motion = motion.command.name(), "motion aborted");
            responses.push(CommandResponse::ack_for(
                &motion.command,
                ControllerErrorCode::MotionAborted.id(),
            ));
        }
        self.jogging.clear();
        if self.servo != ServoStatus::Error {
            self.servo = ServoStatus::Stop;
        }
        responses.push(CommandResponse::ack_for(command, 0));
        responses
    }

    fn target_of(&self, command: &Command) -> Option<(CoordFrame, Pose)> {
        match command {
            Command::NrcMoveJ(m) | Command::NrcMoveL(m) => Some((m.motion.coord, m.motion.pos)),
            Command::NrcMoveLWeave(m) => Some((m.motion.coord, m.motion.pos)),
            Command::NrcGoHome(_) => Some((CoordFrame::Joint, self.config.home)),
            Command::NrcGoResetPosition(_) => Some((CoordFrame::Joint, self.config.reset_position)),
            _ => None,
        }
    }

    /// Accepts a motion and schedules its completion; the reply comes later.
    fn start_motion(
        &mut self,
        command: Command,
        state: SharedState,
        writer: Writer,
    ) -> Vec<CommandResponse> {
        let refused = match self.servo {
            ServoStatus::Ok if self.jogging.is_empty() && self.motion.is_none() => None,
            ServoStatus::Ok | ServoStatus::Running => Some(ControllerErrorCode::ControllerBusy),
            ServoStatus::Error => Some(ControllerErrorCode::InvalidControllerState),
            ServoStatus::Stop => Some(ControllerErrorCode::ServoOff),
        };
        if let Some(code) = refused {
            return vec![CommandResponse::ack_for(&command, code.id())];
        }
        if let Some((CoordFrame::Joint, joints)) = self.target_of(&command) {
            if let Some(joint) = self.config.joint_limit_violation(&joints) {
                warn!(joint = joint + 1, value = joints[joint], "joint limit exceeded");
                self.servo = ServoStatus::Error;
                return vec![CommandResponse::ack_for(
                    &command,
                    ControllerErrorCode::JointLimitExceeded.id(),
                )];
            }
        }

        self.servo = ServoStatus::Running;
        let duration = Duration::from_millis(self.config.motion_duration_ms);
        let task = tokio::spawn(finish_motion(
            state,
            writer,
            command.get_sequence_id(),
            duration,
        ));
        debug!(motion = command.name(), ?duration, "motion started");
        self.motion = Some(ActiveMotion { command, task });
        Vec::new()
    }

    /// Forgets the client and anything it left running.
    fn release_client(&mut self) {
        if let Some(motion) = self.motion.take() {
            motion.task.abort();
        }
        self.jogging.clear();
        if self.servo == ServoStatus::Running {
            self.servo = ServoStatus::Ok;
        }
        self.client = None;
    }
}

async fn finish_motion(state: SharedState, writer: Writer, sequence_id: u32, duration: Duration) {
    tokio::time::sleep(duration).await;
    let response = {
        let mut state = state.lock().await;
        let current = state.motion.as_ref().map(|m| m.command.get_sequence_id());
        if current != Some(sequence_id) {
            return;
        }
        let Some(motion) = state.motion.take() else {
            return;
        };
        if let Some((coord, pose)) = state.target_of(&motion.command) {
            state.positions[coord.index()] = pose;
        }
        state.servo = ServoStatus::Ok;
        debug!(motion = motion.command.name(), "motion complete");
        CommandResponse::ack_for(&motion.command, 0)
    };
    if let Err(e) = send(&writer, &response).await {
        warn!("Failed to report motion completion: {}", e);
    }
}

async fn send(writer: &Writer, packet: &impl Packet) -> Result<(), BoxError> {
    let line = packet.to_line()?;
    writer.lock().await.write_all(line.as_bytes()).await?;
    Ok(())
}

fn handle_command(
    command: Command,
    state: &SharedState,
    writer: &Writer,
    controller: &mut ControllerState,
) -> Vec<CommandResponse> {
    controller.received.push(command.name());
    if controller.config.unresponsive {
        return Vec::new();
    }
    let sequence_id = command.get_sequence_id();
    let response = match &command {
        Command::NrcGetStatus(_) => CommandResponse::NrcGetStatus(controller.status(sequence_id)),
        Command::NrcServoPowerOn(_) => controller.set_power(&command, true),
        Command::NrcServoPowerOff(_) => controller.set_power(&command, false),
        Command::NrcSetServoState(cmd) => controller.set_power(&command, cmd.state == 1),
        Command::NrcClearError(_) => {
            if controller.servo == ServoStatus::Error {
                controller.servo = ServoStatus::Stop;
            }
            CommandResponse::NrcClearError(NrcClearErrorResponse {
                sequence_id,
                error_id: 0,
                servo_status: u8::from(controller.servo),
            })
        }
        Command::NrcSetSpeed(cmd) => controller.configure(&command, |s| s.speed = cmd.speed),
        Command::NrcSetCoord(cmd) => controller.configure(&command, |s| s.coord = cmd.coord),
        Command::NrcSetMode(cmd) => controller.configure(&command, |s| s.mode = cmd.mode),
        Command::NrcSetToolFrame(cmd) => {
            controller.configure(&command, |s| s.tool_num = cmd.tool_num as u8)
        }
        Command::NrcSetUserFrame(cmd) => {
            controller.configure(&command, |s| s.user_num = cmd.user_num as u8)
        }
        Command::NrcWriteToolParam(_) => controller.configure(&command, |_| {}),
        Command::NrcStartJog(cmd) => controller.start_jog(&command, cmd.axis),
        Command::NrcStopJog(cmd) => controller.stop_jog(&command, cmd.axis),
        Command::NrcJobStop(_) => return controller.job_stop(&command),
        Command::NrcReadPosition(cmd) => CommandResponse::NrcReadPosition(NrcReadPositionResponse {
            sequence_id,
            error_id: 0,
            coord: cmd.coord,
            position: controller.positions[cmd.coord.index()],
        }),
        Command::NrcMoveJ(_)
        | Command::NrcMoveL(_)
        | Command::NrcMoveLWeave(_)
        | Command::NrcGoHome(_)
        | Command::NrcGoResetPosition(_) => {
            return controller.start_motion(command, state.clone(), writer.clone())
        }
    };
    vec![response]
}

/// Answers a line that is not a known packet with `UnknownCommand`, if it
/// carries a sequence ID to answer to.
fn reject_unknown(request: &str) -> Option<CommandResponse> {
    let value: serde_json::Value = serde_json::from_str(request).ok()?;
    let sequence_id = value.get("SequenceID")?.as_u64()? as u32;
    Some(CommandResponse::NrcUnknown(NrcAckResponse::new(
        sequence_id,
        ControllerErrorCode::UnknownCommand.id(),
    )))
}

async fn handle_client(socket: TcpStream, state: SharedState) -> Result<(), BoxError> {
    let (mut reader, writer) = socket.into_split();
    let writer: Writer = Arc::new(Mutex::new(writer));
    let mut owns_client = false;
    let mut buffer = vec![0; 1024];
    let mut temp_buffer = Vec::new();

    let result: Result<(), BoxError> = async {
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                return Ok(());
            }
            temp_buffer.extend_from_slice(&buffer[..n]);

            while let Some(pos) = temp_buffer.iter().position(|&x| x == b'\n') {
                let request: Vec<u8> = temp_buffer.drain(..=pos).collect();
                let request = String::from_utf8_lossy(&request);
                let request = request.trim();
                if request.is_empty() {
                    continue;
                }

                let packet = match serde_json::from_str::<SendPacket>(request) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Failed to parse request {}: {}", request, e);
                        if let Some(response) = reject_unknown(request) {
                            send(&writer, &response).await?;
                        }
                        continue;
                    }
                };

                match packet {
                    SendPacket::Communication(Communication::NrcConnect(connect)) => {
                        let response = {
                            let mut controller = state.lock().await;
                            let error_id = if controller.client.is_some() {
                                ControllerErrorCode::RobotAlreadyConnected.id()
                            } else {
                                info!(robot = %connect.robot_name, "client connected");
                                controller.client = Some(connect.robot_name);
                                owns_client = true;
                                0
                            };
                            CommunicationResponse::NrcConnect(NrcConnectResponse {
                                error_id,
                                major_version: controller.config.major_version,
                                minor_version: controller.config.minor_version,
                            })
                        };
                        send(&writer, &response).await?;
                    }
                    SendPacket::Communication(Communication::NrcDisconnect) => {
                        let response =
                            CommunicationResponse::NrcDisconnect(NrcDisconnectResponse { error_id: 0 });
                        send(&writer, &response).await?;
                        return Ok(());
                    }
                    SendPacket::Command(command) => {
                        let responses = {
                            let mut controller = state.lock().await;
                            handle_command(command, &state, &writer, &mut controller)
                        };
                        for response in responses {
                            send(&writer, &response).await?;
                        }
                    }
                }
            }
        }
    }
    .await;

    if owns_client {
        let mut controller = state.lock().await;
        info!(robot = ?controller.client, "client disconnected");
        controller.release_client();
    }
    result
}

async fn accept_loop(listener: TcpListener, state: SharedState) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        debug!(%peer, "accepted connection");

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, state).await {
                warn!("Error handling client: {}", e);
            }
        });
    }
}

/// A running simulator. Dropping it stops accepting connections.
pub struct Simulator {
    addr: SocketAddr,
    state: SharedState,
    accept: JoinHandle<()>,
}

impl Simulator {
    /// Binds `addr` (port `0` picks a free port) and starts serving.
    pub async fn start(addr: &str, config: RobotConfig) -> Result<Self, BoxError> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ControllerState::new(config)));
        let accept = tokio::spawn(accept_loop(listener, state.clone()));
        info!(%addr, "simulator listening");
        Ok(Self {
            addr,
            state,
            accept,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stops answering commands; requests are still read and recorded.
    pub async fn set_unresponsive(&self, unresponsive: bool) {
        self.state.lock().await.config.unresponsive = unresponsive;
    }

    pub async fn servo_status(&self) -> ServoStatus {
        self.state.lock().await.servo
    }

    pub async fn position(&self, coord: CoordFrame) -> Pose {
        self.state.lock().await.positions[coord.index()]
    }

    pub async fn speed(&self) -> u8 {
        self.state.lock().await.speed
    }

    pub async fn client(&self) -> Option<String> {
        self.state.lock().await.client.clone()
    }

    /// Names of every command received, in order.
    pub async fn received(&self) -> Vec<&'static str> {
        self.state.lock().await.received.clone()
    }

    /// Serves until the accept loop ends.
    pub async fn wait(&mut self) -> Result<(), JoinError> {
        (&mut self.accept).await
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.accept.abort();
    }
}
