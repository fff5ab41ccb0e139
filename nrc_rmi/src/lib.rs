use int_enum::IntEnum;
use serde::{Deserialize, Serialize};

// Extract module must be declared first so the macro is available to other modules
#[macro_use]
mod extract;
pub use extract::ExtractInner;

pub mod commands;
pub mod dispatcher;
pub mod errors;
pub mod packets;
pub mod params;
pub mod program;
pub use errors::*;
pub use params::*;

#[cfg(feature = "driver")]
pub mod drivers;
#[cfg(feature = "driver")]
pub mod registry;
#[cfg(feature = "driver")]
pub mod session;

#[cfg(feature = "ffi")]
pub mod ffi;

/// Number of axis values carried by every pose (6 arm joints plus one external axis).
pub const AXIS_COUNT: usize = 7;

/// A full pose: joint angles in coord 0, X/Y/Z/A/B/C/ext in the Cartesian frames.
pub type Pose = [f64; AXIS_COUNT];

/// Power/motion state of the motor drives as reported by `get_servo_state`.
///
/// The discriminants are the integers of the controller's `servoStatus` enum.
#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
pub enum ServoStatus {
    Stop = 0,
    Ok = 1,
    Error = 2,
    Running = 3,
}

impl Default for ServoStatus {
    fn default() -> Self {
        Self::Stop
    }
}

/// Reference frame used to interpret a pose.
///
/// Serialized as its integer index on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "u8", try_from = "u8")]
pub enum CoordFrame {
    Joint,
    Cartesian,
    Tool,
    User,
}

impl CoordFrame {
    pub fn index(self) -> usize {
        u8::from(self) as usize
    }
}

impl From<CoordFrame> for u8 {
    fn from(coord: CoordFrame) -> u8 {
        match coord {
            CoordFrame::Joint => 0,
            CoordFrame::Cartesian => 1,
            CoordFrame::Tool => 2,
            CoordFrame::User => 3,
        }
    }
}

impl TryFrom<u8> for CoordFrame {
    type Error = NrcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        CoordFrame::try_from(value as i32)
    }
}

impl TryFrom<i32> for CoordFrame {
    type Error = NrcError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CoordFrame::Joint),
            1 => Ok(CoordFrame::Cartesian),
            2 => Ok(CoordFrame::Tool),
            3 => Ok(CoordFrame::User),
            other => Err(NrcError::InvalidArgument(format!(
                "coord must be 0..=3, got {other}"
            ))),
        }
    }
}

impl Default for CoordFrame {
    fn default() -> Self {
        Self::Joint
    }
}

/// Controller operating mode.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum RobotMode {
    Teach,
    Remote,
    Run,
}

impl From<RobotMode> for u8 {
    fn from(mode: RobotMode) -> u8 {
        match mode {
            RobotMode::Teach => 0,
            RobotMode::Remote => 1,
            RobotMode::Run => 2,
        }
    }
}

impl TryFrom<u8> for RobotMode {
    type Error = NrcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RobotMode::try_from(value as i32)
    }
}

impl TryFrom<i32> for RobotMode {
    type Error = NrcError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RobotMode::Teach),
            1 => Ok(RobotMode::Remote),
            2 => Ok(RobotMode::Run),
            other => Err(NrcError::InvalidArgument(format!(
                "mode must be 0..=2, got {other}"
            ))),
        }
    }
}

impl Default for RobotMode {
    fn default() -> Self {
        Self::Teach
    }
}

/// Direction of a jog. The C ABI passes it as `bool dir` (`true` = positive).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogDirection {
    Positive,
    Negative,
}

impl From<bool> for JogDirection {
    fn from(dir: bool) -> Self {
        if dir {
            JogDirection::Positive
        } else {
            JogDirection::Negative
        }
    }
}

/// Lifecycle of a robot session.
///
/// `Error` is left only through `clear_error`; `Disconnected` is terminal for
/// the session object (a new `connect` creates a fresh one).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Idle,
    PoweredOn,
    Running,
    Error,
}

impl SessionState {
    pub fn servo_status(self) -> ServoStatus {
        match self {
            SessionState::Disconnected | SessionState::Connecting | SessionState::Idle => {
                ServoStatus::Stop
            }
            SessionState::PoweredOn => ServoStatus::Ok,
            SessionState::Error => ServoStatus::Error,
            SessionState::Running => ServoStatus::Running,
        }
    }

    pub fn from_servo_status(status: ServoStatus) -> Self {
        match status {
            ServoStatus::Stop => SessionState::Idle,
            ServoStatus::Ok => SessionState::PoweredOn,
            ServoStatus::Error => SessionState::Error,
            ServoStatus::Running => SessionState::Running,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Idle => "idle",
            SessionState::PoweredOn => "powered on",
            SessionState::Running => "running",
            SessionState::Error => "in error",
        };
        f.write_str(name)
    }
}
