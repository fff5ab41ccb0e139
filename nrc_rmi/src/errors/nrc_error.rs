use int_enum::IntEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::StatusCode;
use crate::SessionState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NrcError {
    #[error("robot `{0}` is not connected")]
    NotFound(String),
    #[error("robot `{0}` is already connected")]
    AlreadyConnected(String),
    #[error("cannot {operation} while the robot is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },
    #[error("robot is busy: {0}")]
    Busy(&'static str),
    #[error("axis {0} is already jogging")]
    AlreadyJogging(u8),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("controller returned error #{id}: {}", .code.message())]
    Controller { id: u32, code: ControllerErrorCode },
    #[error("motion was aborted by a job stop")]
    MotionAborted,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unrecognized packet: {0}")]
    UnrecognizedPacket(String),
    #[error("library is not initialized")]
    NotInitialized,
}

impl NrcError {
    /// Builds the error for a non-zero `ErrorID` reported by the controller.
    pub fn from_error_id(id: u32) -> Self {
        let code = ControllerErrorCode::from_id(id);
        if code == ControllerErrorCode::MotionAborted {
            NrcError::MotionAborted
        } else {
            NrcError::Controller { id, code }
        }
    }

    /// Integer status reported across the C boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            NrcError::NotFound(_) => StatusCode::NotFound,
            NrcError::AlreadyConnected(_) => StatusCode::AlreadyConnected,
            NrcError::InvalidTransition { .. } => StatusCode::InvalidTransition,
            NrcError::Busy(_) => StatusCode::Busy,
            NrcError::AlreadyJogging(_) => StatusCode::AlreadyJogging,
            NrcError::InvalidArgument(_) => StatusCode::InvalidArgument,
            NrcError::ConnectionLost(_) => StatusCode::ConnectionLost,
            NrcError::Controller { .. } => StatusCode::ControllerFault,
            NrcError::MotionAborted => StatusCode::MotionAborted,
            NrcError::Serialization(_) | NrcError::UnrecognizedPacket(_) => StatusCode::Protocol,
            NrcError::NotInitialized => StatusCode::NotInitialized,
        }
    }

    pub fn is_connection_lost(&self) -> bool {
        matches!(self, NrcError::ConnectionLost(_))
    }
}

impl From<serde_json::Error> for NrcError {
    fn from(e: serde_json::Error) -> Self {
        NrcError::Serialization(e.to_string())
    }
}

/// `ErrorID` values the controller places in its responses. `0` is success.
#[repr(u32)]
#[derive(Debug, Serialize, Deserialize, IntEnum, Clone, Copy, PartialEq, Eq)]
pub enum ControllerErrorCode {
    ServoOff = 1001,
    InvalidControllerState = 1002,
    JointLimitExceeded = 1003,
    MotionAborted = 1004,
    InvalidParameter = 1005,
    UnknownCommand = 1006,
    StopNotConfirmed = 1007,
    ControllerBusy = 1008,
    RobotAlreadyConnected = 1009,
    UnrecognizedNrcError = 9999,
}

impl ControllerErrorCode {
    pub fn from_id(id: u32) -> Self {
        ControllerErrorCode::try_from(id).unwrap_or(ControllerErrorCode::UnrecognizedNrcError)
    }

    pub fn id(self) -> u32 {
        u32::from(self)
    }

    pub fn message(&self) -> &str {
        match self {
            ControllerErrorCode::ServoOff => "Servo is off.",
            ControllerErrorCode::InvalidControllerState => "Invalid controller state.",
            ControllerErrorCode::JointLimitExceeded => "Joint limit exceeded.",
            ControllerErrorCode::MotionAborted => "Motion aborted.",
            ControllerErrorCode::InvalidParameter => "Invalid parameter.",
            ControllerErrorCode::UnknownCommand => "Unknown command.",
            ControllerErrorCode::StopNotConfirmed => "Stop could not be confirmed.",
            ControllerErrorCode::ControllerBusy => "Controller is busy.",
            ControllerErrorCode::RobotAlreadyConnected => "Robot is already connected.",
            ControllerErrorCode::UnrecognizedNrcError => "Unrecognized NRC error ID.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_id_maps_to_motion_aborted() {
        let err = NrcError::from_error_id(ControllerErrorCode::MotionAborted.id());
        assert_eq!(err, NrcError::MotionAborted);
        assert_eq!(err.status_code(), StatusCode::MotionAborted);
    }

    #[test]
    fn unknown_id_keeps_raw_value() {
        let err = NrcError::from_error_id(4242);
        match err {
            NrcError::Controller { id, code } => {
                assert_eq!(id, 4242);
                assert_eq!(code, ControllerErrorCode::UnrecognizedNrcError);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn controller_message_is_in_display() {
        let err = NrcError::from_error_id(ControllerErrorCode::JointLimitExceeded.id());
        assert_eq!(err.to_string(), "controller returned error #1003: Joint limit exceeded.");
    }
}
