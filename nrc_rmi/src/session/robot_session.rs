use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::state::{PositionSample, SessionInner, SessionSnapshot};
use crate::commands::*;
use crate::dispatcher::{self, Dispatcher, ValidatedCommand};
use crate::drivers::Transport;
use crate::packets::{Command, CommandResponse};
use crate::{
    CoordFrame, ExtractInner, JogDirection, MoveCmd, NrcError, Pose, RobotMode, ServoStatus,
    SessionState, ToolParam, WaveParam, AXIS_COUNT,
};

use SessionState::*;

/// One connected robot.
///
/// State-changing calls are serialised by a command lock taken with
/// `try_lock`: a second caller gets [`NrcError::Busy`] instead of queueing.
/// Reads only touch the cached state. [`job_stop`](Self::job_stop) bypasses the
/// command lock and preempts whatever is in flight.
pub struct RobotSession {
    name: String,
    dispatcher: Dispatcher,
    position_timeout: Duration,
    state: RwLock<SessionInner>,
    command_lock: Mutex<()>,
    stop_epoch: AtomicU64,
}

impl std::fmt::Debug for RobotSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotSession")
            .field("name", &self.name)
            .field("stop_epoch", &self.stop_epoch.load(Ordering::SeqCst))
            .finish()
    }
}

impl RobotSession {
    /// Wraps an open transport. The session starts `Idle` with default settings.
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        position_timeout: Duration,
    ) -> Self {
        let name = name.into();
        Self {
            dispatcher: Dispatcher::new(name.clone(), transport),
            name,
            position_timeout,
            state: RwLock::new(SessionInner::default()),
            command_lock: Mutex::new(()),
            stop_epoch: AtomicU64::new(0),
        }
    }

    /// Wraps `transport` and seeds the cached state from `NRC_GetStatus`.
    pub async fn open(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        position_timeout: Duration,
    ) -> Result<Self, NrcError> {
        let session = Self::new(name, transport, position_timeout);
        session.sync_status().await?;
        Ok(session)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Re-reads servo state, speed, coord, mode and frame indices from the controller.
    pub async fn sync_status(&self) -> Result<(), NrcError> {
        let _command = self.begin()?;
        self.state.read().await.require_link()?;
        let response = self.exchange(Command::get_status()).await?;
        let status: NrcGetStatusResponse = response
            .into_inner()
            .ok_or_else(|| NrcError::UnrecognizedPacket("expected NRC_GetStatus".to_string()))?;
        let mut inner = self.state.write().await;
        inner.apply_status(&status);
        info!(robot = %self.name, state = %inner.state, speed = inner.speed, "status synchronised");
        Ok(())
    }

    fn begin(&self) -> Result<MutexGuard<'_, ()>, NrcError> {
        self.command_lock
            .try_lock()
            .map_err(|_| NrcError::Busy("another command is in flight"))
    }

    fn epoch(&self) -> u64 {
        self.stop_epoch.load(Ordering::SeqCst)
    }

    /// Sends one command; a dead link turns the session into a tombstone.
    async fn exchange(&self, command: Command) -> Result<CommandResponse, NrcError> {
        let validated = dispatcher::validate(command)?;
        self.exchange_validated(validated).await
    }

    async fn exchange_validated(
        &self,
        command: ValidatedCommand,
    ) -> Result<CommandResponse, NrcError> {
        let result = self.dispatcher.dispatch(command).await;
        if let Err(e) = &result {
            if e.is_connection_lost() {
                self.mark_disconnected(e).await;
            }
        }
        result
    }

    async fn mark_disconnected(&self, cause: &NrcError) {
        let mut inner = self.state.write().await;
        if inner.state != Disconnected {
            warn!(robot = %self.name, "session lost its link: {}", cause);
            inner.halt(Disconnected);
        }
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub async fn state(&self) -> SessionState {
        self.state.read().await.state
    }

    pub async fn get_servo_state(&self) -> ServoStatus {
        self.state.read().await.state.servo_status()
    }

    /// `1` while running, otherwise `0`.
    pub async fn get_robot_running_state(&self) -> i32 {
        i32::from(self.state.read().await.state == Running)
    }

    pub async fn get_speed(&self) -> u8 {
        self.state.read().await.speed
    }

    pub async fn get_current_coord(&self) -> CoordFrame {
        self.state.read().await.coord
    }

    pub async fn get_current_mode(&self) -> RobotMode {
        self.state.read().await.mode
    }

    pub async fn get_tool_frame(&self) -> i32 {
        self.state.read().await.tool_num
    }

    pub async fn get_user_frame(&self) -> i32 {
        self.state.read().await.user_num
    }

    pub async fn get_tool_param(&self, tool_num: i32) -> Option<ToolParam> {
        self.state.read().await.tool_params.get(&tool_num).copied()
    }

    pub async fn jogging_axes(&self) -> Vec<u8> {
        self.state.read().await.jogging.iter().copied().collect()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot(&self.name)
    }

    /// `Ok` while the link is up. A dropped link turns the session into a
    /// `Disconnected` tombstone and yields [`NrcError::ConnectionLost`].
    pub async fn connection_status(&self) -> Result<(), NrcError> {
        self.state.read().await.require_link()?;
        if self.dispatcher.transport().is_connected() {
            Ok(())
        } else {
            let err = NrcError::ConnectionLost("transport reports the link is down".to_string());
            self.mark_disconnected(&err).await;
            Err(err)
        }
    }

    /// Reads the pose in `coord` with one exchange bounded by the position timeout.
    ///
    /// When the controller does not answer in time, or answers with an error, the
    /// cached sample is returned with `stale` set. Only a lost link is an error.
    pub async fn get_current_position(&self, coord: CoordFrame) -> Result<PositionSample, NrcError> {
        self.state.read().await.require_link()?;
        match self.read_position(coord).await {
            Ok(sample) => Ok(sample),
            Err(e) if e.is_connection_lost() => Err(e),
            Err(e) => {
                debug!(robot = %self.name, ?coord, "serving cached position: {}", e);
                Ok(self.state.read().await.cached_position(coord))
            }
        }
    }

    async fn read_position(&self, coord: CoordFrame) -> Result<PositionSample, NrcError> {
        let generation = self.state.read().await.cache_generation;
        let command = Command::NrcReadPosition(NrcReadPosition::new(coord));
        let response = match timeout(self.position_timeout, self.exchange(command)).await {
            Ok(response) => response?,
            Err(_) => {
                return Err(NrcError::Busy("controller did not report a position in time"))
            }
        };
        let reading: NrcReadPositionResponse = response
            .into_inner()
            .ok_or_else(|| NrcError::UnrecognizedPacket("expected NRC_ReadPosition".to_string()))?;
        if reading.coord != coord {
            return Err(NrcError::UnrecognizedPacket(format!(
                "asked for {:?} position, got {:?}",
                coord, reading.coord
            )));
        }
        let sample = PositionSample::fresh(coord, reading.position);
        if !self.state.write().await.record_reading(generation, &sample) {
            debug!(robot = %self.name, ?coord, "reading predates the last motion, not cached");
        }
        Ok(sample)
    }

    // ---------------------------------------------------------------
    // Servo power and recovery
    // ---------------------------------------------------------------

    pub async fn set_servo_poweron(&self) -> Result<(), NrcError> {
        self.set_power("power on", Command::servo_power_on(), true).await
    }

    pub async fn set_servo_poweroff(&self) -> Result<(), NrcError> {
        self.set_power("power off", Command::servo_power_off(), false).await
    }

    /// `0` powers the drives off, `1` powers them on. The other servo values
    /// are reported by the controller and cannot be requested.
    pub async fn set_servo_state(&self, state: i32) -> Result<(), NrcError> {
        dispatcher::validate_servo_state(state)?;
        let command = Command::NrcSetServoState(NrcSetServoState::new(state as u8));
        self.set_power("set servo state", command, state == 1).await
    }

    async fn set_power(
        &self,
        operation: &'static str,
        command: Command,
        on: bool,
    ) -> Result<(), NrcError> {
        let _command = self.begin()?;
        let epoch = {
            let inner = self.state.read().await;
            inner.require(operation, &[Idle, PoweredOn])?;
            self.epoch()
        };
        self.exchange(command).await?;

        {
            let mut inner = self.state.write().await;
            if self.epoch() == epoch {
                inner.state = if on { PoweredOn } else { Idle };
                info!(robot = %self.name, "servo {}", if on { "on" } else { "off" });
                return Ok(());
            }
        }
        if on {
            self.undo_power_on(operation).await?;
        }
        Err(NrcError::MotionAborted)
    }

    /// The controller accepted a power-on that a job stop had already
    /// overtaken, so the drives may be live again. Power them back off.
    async fn undo_power_on(&self, operation: &'static str) -> Result<(), NrcError> {
        warn!(robot = %self.name, operation, "power on landed after a job stop, powering off");
        if let Err(e) = self.exchange(Command::servo_power_off()).await {
            if !e.is_connection_lost() {
                warn!(robot = %self.name, "could not power off after the stop: {}", e);
                self.state.write().await.halt(Error);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Resets a controller fault. From `Error` the new state follows the servo
    /// status the controller reports; from any other state the request is still
    /// sent and the state is kept.
    pub async fn clear_error(&self) -> Result<(), NrcError> {
        let _command = self.begin()?;
        self.state.read().await.require_link()?;
        let response = self.exchange(Command::clear_error()).await?;
        let cleared: NrcClearErrorResponse = response
            .into_inner()
            .ok_or_else(|| NrcError::UnrecognizedPacket("expected NRC_ClearError".to_string()))?;

        let mut inner = self.state.write().await;
        if inner.state == Error {
            inner.state = match ServoStatus::try_from(cleared.servo_status).ok() {
                Some(ServoStatus::Ok) => PoweredOn,
                _ => Idle,
            };
            info!(robot = %self.name, state = %inner.state, "error cleared");
        }
        Ok(())
    }

    /// Halts everything. Valid in every connected state and never blocked by
    /// the command lock.
    pub async fn job_stop(&self) -> Result<(), NrcError> {
        let prior = {
            let mut inner = self.state.write().await;
            inner.require_link()?;
            self.stop_epoch.fetch_add(1, Ordering::SeqCst);
            let prior = inner.state;
            inner.halt(if prior == Error { Error } else { Idle });
            prior
        };
        info!(robot = %self.name, from = %prior, "job stop");

        let result = self.exchange(Command::job_stop()).await;
        if let Err(e) = &result {
            if !e.is_connection_lost() {
                warn!(robot = %self.name, "stop was not confirmed: {}", e);
                self.state.write().await.halt(Error);
            }
        }
        result.map(|_| ())
    }

    // ---------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------

    async fn configure(
        &self,
        operation: &'static str,
        command: Command,
        apply: impl FnOnce(&mut SessionInner),
    ) -> Result<(), NrcError> {
        let command = dispatcher::validate(command)?;
        let _command = self.begin()?;
        self.state.read().await.require_configurable(operation)?;
        self.exchange_validated(command).await?;
        apply(&mut *self.state.write().await);
        debug!(robot = %self.name, operation, "applied");
        Ok(())
    }

    pub async fn set_speed(&self, speed: i32) -> Result<(), NrcError> {
        dispatcher::validate_speed(speed)?;
        let speed = speed as u8;
        self.configure("set speed", Command::NrcSetSpeed(NrcSetSpeed::new(speed)), |inner| {
            inner.speed = speed
        })
        .await
    }

    pub async fn set_current_coord(&self, coord: i32) -> Result<(), NrcError> {
        let coord = CoordFrame::try_from(coord)?;
        self.configure("set coord", Command::NrcSetCoord(NrcSetCoord::new(coord)), |inner| {
            inner.coord = coord
        })
        .await
    }

    pub async fn set_current_mode(&self, mode: i32) -> Result<(), NrcError> {
        let mode = RobotMode::try_from(mode)?;
        self.configure("set mode", Command::NrcSetMode(NrcSetMode::new(mode)), |inner| {
            inner.mode = mode
        })
        .await
    }

    pub async fn set_tool_frame(&self, tool_num: i32) -> Result<(), NrcError> {
        let command = Command::NrcSetToolFrame(NrcSetToolFrame::new(tool_num));
        self.configure("set tool frame", command, |inner| inner.tool_num = tool_num)
            .await
    }

    pub async fn set_user_frame(&self, user_num: i32) -> Result<(), NrcError> {
        let command = Command::NrcSetUserFrame(NrcSetUserFrame::new(user_num));
        self.configure("set user frame", command, |inner| inner.user_num = user_num)
            .await
    }

    pub async fn set_tool_param(&self, tool_num: i32, param: ToolParam) -> Result<(), NrcError> {
        let command = Command::NrcWriteToolParam(NrcWriteToolParam::new(tool_num, param));
        self.configure("set tool param", command, |inner| {
            inner.tool_params.insert(tool_num, param);
        })
        .await
    }

    // ---------------------------------------------------------------
    // Motion
    // ---------------------------------------------------------------

    pub async fn robot_movej(&self, cmd: MoveCmd) -> Result<(), NrcError> {
        let arrival = (cmd.coord, cmd.pos);
        self.run_motion("movej", Command::NrcMoveJ(NrcMotion::new(cmd)), None, Some(arrival))
            .await
    }

    pub async fn robot_movel(&self, cmd: MoveCmd) -> Result<(), NrcError> {
        let arrival = (cmd.coord, cmd.pos);
        self.run_motion("movel", Command::NrcMoveL(NrcMotion::new(cmd)), None, Some(arrival))
            .await
    }

    /// Linear move with a weave overlay; the overlay is held only while moving.
    pub async fn robot_movel_weave(&self, cmd: MoveCmd, wave: WaveParam) -> Result<(), NrcError> {
        let arrival = (cmd.coord, cmd.pos);
        let command = Command::NrcMoveLWeave(NrcWeaveMotion::new(cmd, wave));
        self.run_motion("movel weave", command, Some(wave), Some(arrival))
            .await
    }

    pub async fn robot_go_home(&self) -> Result<(), NrcError> {
        self.run_motion("go home", Command::go_home(), None, None).await
    }

    pub async fn robot_go_to_reset_position(&self) -> Result<(), NrcError> {
        self.run_motion("go to reset position", Command::go_reset_position(), None, None)
            .await
    }

    /// Moves one joint (0-based) by `delta` from a freshly read joint pose.
    pub async fn move_joint_relative(
        &self,
        joint_index: usize,
        delta: f64,
        velocity: f64,
        acc: f64,
        dec: f64,
    ) -> Result<(), NrcError> {
        if joint_index >= AXIS_COUNT {
            return Err(NrcError::InvalidArgument(format!(
                "joint index must be 0..{AXIS_COUNT}, got {joint_index}"
            )));
        }
        let mut pos = self.current_pose(CoordFrame::Joint).await?;
        pos[joint_index] += delta;
        self.robot_movej(MoveCmd::new(pos, CoordFrame::Joint, velocity, acc, dec))
            .await
    }

    /// Steps the tool along X, Y or Z (index 0..=2) from a freshly read Cartesian pose.
    pub async fn linear_step(
        &self,
        axis_index: usize,
        delta: f64,
        velocity: f64,
        acc: f64,
        dec: f64,
    ) -> Result<(), NrcError> {
        if axis_index > 2 {
            return Err(NrcError::InvalidArgument(format!(
                "linear axis must be 0 (X), 1 (Y) or 2 (Z), got {axis_index}"
            )));
        }
        let mut pos = self.current_pose(CoordFrame::Cartesian).await?;
        pos[axis_index] += delta;
        self.robot_movel(MoveCmd::new(pos, CoordFrame::Cartesian, velocity, acc, dec))
            .await
    }

    /// Relative moves never start from a cached pose.
    pub(crate) async fn current_pose(&self, coord: CoordFrame) -> Result<Pose, NrcError> {
        self.state.read().await.require_link()?;
        Ok(self.read_position(coord).await?.position)
    }

    async fn run_motion(
        &self,
        operation: &'static str,
        command: Command,
        weave: Option<WaveParam>,
        arrival: Option<(CoordFrame, Pose)>,
    ) -> Result<(), NrcError> {
        let command = dispatcher::validate(command)?;
        let _command = self.begin()?;
        let epoch = {
            let mut inner = self.state.write().await;
            inner.require(operation, &[PoweredOn])?;
            inner.state = Running;
            inner.weave = weave;
            self.epoch()
        };
        debug!(robot = %self.name, operation, "motion started");

        let result = self.exchange_validated(command).await;

        let mut inner = self.state.write().await;
        if self.epoch() != epoch {
            // job_stop already settled the state
            debug!(robot = %self.name, operation, "motion preempted");
            return match result {
                Err(e) if e.is_connection_lost() => Err(e),
                _ => Err(NrcError::MotionAborted),
            };
        }
        match result {
            Ok(_) => {
                inner.state = PoweredOn;
                inner.weave = None;
                match arrival {
                    Some((coord, pos)) => inner.record_arrival(coord, pos),
                    None => inner.forget_positions(),
                }
                debug!(robot = %self.name, operation, "motion complete");
                Ok(())
            }
            Err(e) if e.is_connection_lost() => Err(e),
            Err(e) => {
                warn!(robot = %self.name, operation, "motion faulted: {}", e);
                inner.halt(Error);
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------
    // Jogging
    // ---------------------------------------------------------------

    /// Starts jogging `axis` (1-based). Further axes may join while jogging.
    pub async fn robot_start_jogging(&self, axis: i32, direction: JogDirection) -> Result<(), NrcError> {
        dispatcher::validate_axis(axis)?;
        let axis = axis as u8;
        let command = dispatcher::validate(Command::NrcStartJog(NrcStartJog::new(axis, direction)))?;
        let _command = self.begin()?;
        let epoch = {
            let inner = self.state.read().await;
            inner.require_link()?;
            if inner.jogging.contains(&axis) {
                return Err(NrcError::AlreadyJogging(axis));
            }
            let jogging = inner.state == Running && !inner.jogging.is_empty();
            if !jogging {
                inner.require("start jogging", &[PoweredOn])?;
            }
            self.epoch()
        };

        let result = self.exchange_validated(command).await;

        let mut inner = self.state.write().await;
        if self.epoch() != epoch {
            return match result {
                Err(e) if e.is_connection_lost() => Err(e),
                _ => Err(NrcError::MotionAborted),
            };
        }
        match result {
            Ok(_) => {
                inner.jogging.insert(axis);
                inner.state = Running;
                debug!(robot = %self.name, axis, ?direction, "jogging");
                Ok(())
            }
            Err(e) if e.is_connection_lost() => Err(e),
            Err(e) => {
                warn!(robot = %self.name, axis, "jog faulted: {}", e);
                inner.halt(Error);
                Err(e)
            }
        }
    }

    /// Stops jogging `axis`. An axis that is not jogging is a no-op.
    pub async fn robot_stop_jogging(&self, axis: i32) -> Result<(), NrcError> {
        dispatcher::validate_axis(axis)?;
        let axis = axis as u8;
        {
            let inner = self.state.read().await;
            inner.require_link()?;
            if !inner.jogging.contains(&axis) {
                return Ok(());
            }
        }
        let command = dispatcher::validate(Command::NrcStopJog(NrcStopJog::new(axis)))?;
        let _command = self.begin()?;
        let epoch = self.epoch();

        let result = self.exchange_validated(command).await;

        let mut inner = self.state.write().await;
        if self.epoch() != epoch {
            // the stop already released every axis
            return result.map(|_| ());
        }
        match result {
            Ok(_) => {
                inner.jogging.remove(&axis);
                if inner.jogging.is_empty() && inner.state == Running {
                    inner.state = PoweredOn;
                }
                debug!(robot = %self.name, axis, "jog stopped");
                Ok(())
            }
            Err(e) if e.is_connection_lost() => Err(e),
            Err(e) => {
                warn!(robot = %self.name, axis, "jog stop faulted: {}", e);
                inner.halt(Error);
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Tombstones the session and closes its transport.
    pub async fn close(&self) -> Result<(), NrcError> {
        {
            let mut inner = self.state.write().await;
            self.stop_epoch.fetch_add(1, Ordering::SeqCst);
            inner.halt(Disconnected);
        }
        self.dispatcher.transport().close().await
    }
}
