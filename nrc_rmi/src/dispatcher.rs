//! Command validation and the single-exchange dispatch contract.
//!
//! Every command that leaves a session passes through [`validate`] first. Only a
//! [`ValidatedCommand`] can be handed to [`Dispatcher::dispatch`], so a malformed
//! pose or parameter never reaches the transport.

use crate::commands::*;
use crate::packets::Command;
use crate::{MoveCmd, NrcError, ToolParam, WaveParam, AXIS_COUNT, FRAME_COUNT};

pub const SPEED_MIN: u8 = 1;
pub const SPEED_MAX: u8 = 100;
pub const WAVE_TYPE_MAX: i32 = 3;

/// A command whose fields passed range checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCommand(Command);

impl ValidatedCommand {
    pub fn into_command(self) -> Command {
        self.0
    }
}

pub fn validate(command: Command) -> Result<ValidatedCommand, NrcError> {
    match &command {
        Command::NrcSetServoState(cmd) => validate_servo_state(cmd.state as i32)?,
        Command::NrcSetSpeed(cmd) => validate_speed(cmd.speed as i32)?,
        Command::NrcSetToolFrame(cmd) => validate_frame_index("tool", cmd.tool_num)?,
        Command::NrcSetUserFrame(cmd) => validate_frame_index("user", cmd.user_num)?,
        Command::NrcWriteToolParam(cmd) => {
            validate_frame_index("tool", cmd.tool_num)?;
            validate_tool_param(&cmd.param)?;
        }
        Command::NrcStartJog(NrcStartJog { axis, .. }) | Command::NrcStopJog(NrcStopJog { axis, .. }) => {
            validate_axis(*axis as i32)?;
        }
        Command::NrcMoveJ(cmd) | Command::NrcMoveL(cmd) => validate_move(&cmd.motion)?,
        Command::NrcMoveLWeave(cmd) => {
            validate_move(&cmd.motion)?;
            validate_wave(&cmd.wave)?;
        }
        Command::NrcGetStatus(_)
        | Command::NrcServoPowerOn(_)
        | Command::NrcServoPowerOff(_)
        | Command::NrcClearError(_)
        | Command::NrcSetCoord(_)
        | Command::NrcSetMode(_)
        | Command::NrcGoHome(_)
        | Command::NrcGoResetPosition(_)
        | Command::NrcJobStop(_)
        | Command::NrcReadPosition(_) => {}
    }
    Ok(ValidatedCommand(command))
}

fn invalid(message: String) -> NrcError {
    NrcError::InvalidArgument(message)
}

/// Only power-off (0) and power-on (1) can be requested directly.
pub fn validate_servo_state(state: i32) -> Result<(), NrcError> {
    match state {
        0 | 1 => Ok(()),
        2 | 3 => Err(invalid(format!(
            "servo state {state} is reported by the controller and cannot be set"
        ))),
        other => Err(invalid(format!("servo state must be 0 or 1, got {other}"))),
    }
}

pub fn validate_speed(speed: i32) -> Result<(), NrcError> {
    if (SPEED_MIN as i32..=SPEED_MAX as i32).contains(&speed) {
        Ok(())
    } else {
        Err(invalid(format!(
            "speed must be {SPEED_MIN}..={SPEED_MAX}, got {speed}"
        )))
    }
}

pub fn validate_frame_index(kind: &str, index: i32) -> Result<(), NrcError> {
    if (0..FRAME_COUNT).contains(&index) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{kind} frame must be 0..{FRAME_COUNT}, got {index}"
        )))
    }
}

/// Jog axes are 1-based.
pub fn validate_axis(axis: i32) -> Result<(), NrcError> {
    if (1..=AXIS_COUNT as i32).contains(&axis) {
        Ok(())
    } else {
        Err(invalid(format!("axis must be 1..={AXIS_COUNT}, got {axis}")))
    }
}

fn finite(name: &str, value: f64) -> Result<(), NrcError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), NrcError> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be >= 0, got {value}")))
    }
}

fn positive(name: &str, value: f64) -> Result<(), NrcError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be > 0, got {value}")))
    }
}

pub fn validate_move(cmd: &MoveCmd) -> Result<(), NrcError> {
    for (axis, value) in cmd.pos.iter().enumerate() {
        if !value.is_finite() {
            return Err(invalid(format!(
                "position[{axis}] must be finite, got {value}"
            )));
        }
    }
    positive("velocity", cmd.velocity)?;
    positive("acc", cmd.acc)?;
    positive("dec", cmd.dec)?;
    if cmd.pl < 0 {
        return Err(invalid(format!("pl must be >= 0, got {}", cmd.pl)));
    }
    validate_frame_index("tool", cmd.tool_num)?;
    validate_frame_index("user", cmd.user_num)?;
    Ok(())
}

pub fn validate_wave(wave: &WaveParam) -> Result<(), NrcError> {
    if !(0..=WAVE_TYPE_MAX).contains(&wave.wave_type) {
        return Err(invalid(format!(
            "wave type must be 0..={WAVE_TYPE_MAX}, got {}",
            wave.wave_type
        )));
    }
    positive("swing_freq", wave.swing_freq)?;
    non_negative("swing_amplitude", wave.swing_amplitude)?;
    non_negative("radius", wave.radius)?;
    finite("l_type_angle", wave.l_type_angle)?;
    non_negative("left_stay_time", wave.left_stay_time)?;
    non_negative("right_stay_time", wave.right_stay_time)?;
    if !matches!(wave.initial_dir, 0 | 1) {
        return Err(invalid(format!(
            "initial_dir must be 0 or 1, got {}",
            wave.initial_dir
        )));
    }
    finite("horizontal_deflection", wave.horizontal_deflection)?;
    finite("vertical_deflection", wave.vertical_deflection)?;
    Ok(())
}

pub fn validate_tool_param(param: &ToolParam) -> Result<(), NrcError> {
    for (name, value) in [
        ("x", param.x),
        ("y", param.y),
        ("z", param.z),
        ("a", param.a),
        ("b", param.b),
        ("c", param.c),
        ("payload_mass_center_x", param.payload_mass_center_x),
        ("payload_mass_center_y", param.payload_mass_center_y),
        ("payload_mass_center_z", param.payload_mass_center_z),
    ] {
        finite(name, value)?;
    }
    non_negative("payload_mass", param.payload_mass)?;
    non_negative("payload_inertia", param.payload_inertia)?;
    Ok(())
}

#[cfg(feature = "driver")]
pub use self::dispatch::Dispatcher;

#[cfg(feature = "driver")]
mod dispatch {
    use std::sync::Arc;

    use tracing::{debug, warn, Instrument};

    use super::ValidatedCommand;
    use crate::drivers::Transport;
    use crate::packets::CommandResponse;
    use crate::NrcError;

    /// Forwards validated commands for one robot and awaits exactly one answer.
    #[derive(Clone)]
    pub struct Dispatcher {
        robot_name: String,
        transport: Arc<dyn Transport>,
    }

    impl std::fmt::Debug for Dispatcher {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Dispatcher")
                .field("robot_name", &self.robot_name)
                .field("connected", &self.transport.is_connected())
                .finish()
        }
    }

    impl Dispatcher {
        pub fn new(robot_name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
            Self {
                robot_name: robot_name.into(),
                transport,
            }
        }

        pub fn transport(&self) -> &Arc<dyn Transport> {
            &self.transport
        }

        pub async fn dispatch(
            &self,
            command: ValidatedCommand,
        ) -> Result<CommandResponse, NrcError> {
            let command = command.into_command();
            let name = command.name();
            let span = tracing::debug_span!("dispatch", robot = %self.robot_name, command = name);

            async move {
                debug!("sending");
                let response = self.transport.send(command).await?;

                let error_id = response.get_error_id();
                if error_id != 0 {
                    let err = NrcError::from_error_id(error_id);
                    warn!(error_id, "controller rejected command: {}", err);
                    return Err(err);
                }
                if response.name() != name {
                    warn!(response = response.name(), "mismatched response");
                    return Err(NrcError::UnrecognizedPacket(format!(
                        "expected {name} response, got {}",
                        response.name()
                    )));
                }
                debug!(sequence_id = response.get_sequence_id(), "acknowledged");
                Ok(response)
            }
            .instrument(span)
            .await
        }
    }
}
