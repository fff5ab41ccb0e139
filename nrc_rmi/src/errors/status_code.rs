use int_enum::IntEnum;

use super::NrcError;

/// Integer results of the exported C functions.
///
/// `0` is success, positive values are non-fatal conditions and negative
/// values are errors.
#[repr(i32)]
#[derive(Debug, IntEnum, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 0,
    Stale = 1,
    Connecting = 2,
    NotFound = -1,
    AlreadyConnected = -2,
    InvalidTransition = -3,
    Busy = -4,
    AlreadyJogging = -5,
    InvalidArgument = -6,
    ConnectionLost = -7,
    ControllerFault = -8,
    MotionAborted = -9,
    Protocol = -10,
    NotInitialized = -11,
}

impl StatusCode {
    pub fn code(self) -> i32 {
        i32::from(self)
    }
}

impl From<&NrcError> for StatusCode {
    fn from(e: &NrcError) -> Self {
        e.status_code()
    }
}

/// Collapses a unit result into the integer convention of the C ABI.
pub fn to_status(result: Result<(), NrcError>) -> i32 {
    match result {
        Ok(()) => StatusCode::Ok.code(),
        Err(e) => e.status_code().code(),
    }
}
