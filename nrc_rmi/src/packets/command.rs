use crate::commands::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "Command")]
pub enum Command {
    #[serde(rename = "NRC_GetStatus")]
    NrcGetStatus(NrcBareCommand),

    #[serde(rename = "NRC_SetServoState")]
    NrcSetServoState(NrcSetServoState),

    #[serde(rename = "NRC_ServoPowerOn")]
    NrcServoPowerOn(NrcBareCommand),

    #[serde(rename = "NRC_ServoPowerOff")]
    NrcServoPowerOff(NrcBareCommand),

    #[serde(rename = "NRC_ClearError")]
    NrcClearError(NrcBareCommand),

    #[serde(rename = "NRC_SetSpeed")]
    NrcSetSpeed(NrcSetSpeed),

    #[serde(rename = "NRC_SetCoord")]
    NrcSetCoord(NrcSetCoord),

    #[serde(rename = "NRC_SetMode")]
    NrcSetMode(NrcSetMode),

    #[serde(rename = "NRC_SetToolFrame")]
    NrcSetToolFrame(NrcSetToolFrame),

    #[serde(rename = "NRC_SetUserFrame")]
    NrcSetUserFrame(NrcSetUserFrame),

    #[serde(rename = "NRC_WriteToolParam")]
    NrcWriteToolParam(NrcWriteToolParam),

    #[serde(rename = "NRC_StartJog")]
    NrcStartJog(NrcStartJog),

    #[serde(rename = "NRC_StopJog")]
    NrcStopJog(NrcStopJog),

    #[serde(rename = "NRC_GoHome")]
    NrcGoHome(NrcBareCommand),

    #[serde(rename = "NRC_GoResetPosition")]
    NrcGoResetPosition(NrcBareCommand),

    #[serde(rename = "NRC_MoveJ")]
    NrcMoveJ(NrcMotion),

    #[serde(rename = "NRC_MoveL")]
    NrcMoveL(NrcMotion),

    #[serde(rename = "NRC_MoveLWeave")]
    NrcMoveLWeave(NrcWeaveMotion),

    // only command the session sends outside its command lock
    #[serde(rename = "NRC_JobStop")]
    NrcJobStop(NrcBareCommand),

    #[serde(rename = "NRC_ReadPosition")]
    NrcReadPosition(NrcReadPosition),
}

impl Command {
    pub fn get_status() -> Self {
        Command::NrcGetStatus(NrcBareCommand::default())
    }

    pub fn servo_power_on() -> Self {
        Command::NrcServoPowerOn(NrcBareCommand::default())
    }

    pub fn servo_power_off() -> Self {
        Command::NrcServoPowerOff(NrcBareCommand::default())
    }

    pub fn clear_error() -> Self {
        Command::NrcClearError(NrcBareCommand::default())
    }

    pub fn go_home() -> Self {
        Command::NrcGoHome(NrcBareCommand::default())
    }

    pub fn go_reset_position() -> Self {
        Command::NrcGoResetPosition(NrcBareCommand::default())
    }

    pub fn job_stop() -> Self {
        Command::NrcJobStop(NrcBareCommand::default())
    }

    /// Wire tag of the command, e.g. `NRC_MoveJ`.
    pub fn name(&self) -> &'static str {
        match self {
            Command::NrcGetStatus(_) => "NRC_GetStatus",
            Command::NrcSetServoState(_) => "NRC_SetServoState",
            Command::NrcServoPowerOn(_) => "NRC_ServoPowerOn",
            Command::NrcServoPowerOff(_) => "NRC_ServoPowerOff",
            Command::NrcClearError(_) => "NRC_ClearError",
            Command::NrcSetSpeed(_) => "NRC_SetSpeed",
            Command::NrcSetCoord(_) => "NRC_SetCoord",
            Command::NrcSetMode(_) => "NRC_SetMode",
            Command::NrcSetToolFrame(_) => "NRC_SetToolFrame",
            Command::NrcSetUserFrame(_) => "NRC_SetUserFrame",
            Command::NrcWriteToolParam(_) => "NRC_WriteToolParam",
            Command::NrcStartJog(_) => "NRC_StartJog",
            Command::NrcStopJog(_) => "NRC_StopJog",
            Command::NrcGoHome(_) => "NRC_GoHome",
            Command::NrcGoResetPosition(_) => "NRC_GoResetPosition",
            Command::NrcMoveJ(_) => "NRC_MoveJ",
            Command::NrcMoveL(_) => "NRC_MoveL",
            Command::NrcMoveLWeave(_) => "NRC_MoveLWeave",
            Command::NrcJobStop(_) => "NRC_JobStop",
            Command::NrcReadPosition(_) => "NRC_ReadPosition",
        }
    }

    /// Motion commands are acknowledged only once the robot has arrived.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Command::NrcGoHome(_)
                | Command::NrcGoResetPosition(_)
                | Command::NrcMoveJ(_)
                | Command::NrcMoveL(_)
                | Command::NrcMoveLWeave(_)
        )
    }

    pub fn get_sequence_id(&self) -> u32 {
        match self {
            Command::NrcGetStatus(cmd)
            | Command::NrcServoPowerOn(cmd)
            | Command::NrcServoPowerOff(cmd)
            | Command::NrcClearError(cmd)
            | Command::NrcGoHome(cmd)
            | Command::NrcGoResetPosition(cmd)
            | Command::NrcJobStop(cmd) => cmd.sequence_id,
            Command::NrcSetServoState(cmd) => cmd.sequence_id,
            Command::NrcSetSpeed(cmd) => cmd.sequence_id,
            Command::NrcSetCoord(cmd) => cmd.sequence_id,
            Command::NrcSetMode(cmd) => cmd.sequence_id,
            Command::NrcSetToolFrame(cmd) => cmd.sequence_id,
            Command::NrcSetUserFrame(cmd) => cmd.sequence_id,
            Command::NrcWriteToolParam(cmd) => cmd.sequence_id,
            Command::NrcStartJog(cmd) => cmd.sequence_id,
            Command::NrcStopJog(cmd) => cmd.sequence_id,
            Command::NrcMoveJ(cmd) | Command::NrcMoveL(cmd) => cmd.sequence_id,
            Command::NrcMoveLWeave(cmd) => cmd.sequence_id,
            Command::NrcReadPosition(cmd) => cmd.sequence_id,
        }
    }

    pub fn set_sequence_id(&mut self, sequence_id: u32) {
        match self {
            Command::NrcGetStatus(cmd)
            | Command::NrcServoPowerOn(cmd)
            | Command::NrcServoPowerOff(cmd)
            | Command::NrcClearError(cmd)
            | Command::NrcGoHome(cmd)
            | Command::NrcGoResetPosition(cmd)
            | Command::NrcJobStop(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcSetServoState(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcSetSpeed(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcSetCoord(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcSetMode(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcSetToolFrame(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcSetUserFrame(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcWriteToolParam(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcStartJog(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcStopJog(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcMoveJ(cmd) | Command::NrcMoveL(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcMoveLWeave(cmd) => cmd.sequence_id = sequence_id,
            Command::NrcReadPosition(cmd) => cmd.sequence_id = sequence_id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "Command")]
pub enum CommandResponse {
    #[serde(rename = "NRC_GetStatus")]
    NrcGetStatus(NrcGetStatusResponse),

    #[serde(rename = "NRC_SetServoState")]
    NrcSetServoState(NrcAckResponse),

    #[serde(rename = "NRC_ServoPowerOn")]
    NrcServoPowerOn(NrcAckResponse),

    #[serde(rename = "NRC_ServoPowerOff")]
    NrcServoPowerOff(NrcAckResponse),

    #[serde(rename = "NRC_ClearError")]
    NrcClearError(NrcClearErrorResponse),

    #[serde(rename = "NRC_SetSpeed")]
    NrcSetSpeed(NrcAckResponse),

    #[serde(rename = "NRC_SetCoord")]
    NrcSetCoord(NrcAckResponse),

    #[serde(rename = "NRC_SetMode")]
    NrcSetMode(NrcAckResponse),

    #[serde(rename = "NRC_SetToolFrame")]
    NrcSetToolFrame(NrcAckResponse),

    #[serde(rename = "NRC_SetUserFrame")]
    NrcSetUserFrame(NrcAckResponse),

    #[serde(rename = "NRC_WriteToolParam")]
    NrcWriteToolParam(NrcAckResponse),

    #[serde(rename = "NRC_StartJog")]
    NrcStartJog(NrcAckResponse),

    #[serde(rename = "NRC_StopJog")]
    NrcStopJog(NrcAckResponse),

    #[serde(rename = "NRC_GoHome")]
    NrcGoHome(NrcAckResponse),

    #[serde(rename = "NRC_GoResetPosition")]
    NrcGoResetPosition(NrcAckResponse),

    #[serde(rename = "NRC_MoveJ")]
    NrcMoveJ(NrcAckResponse),

    #[serde(rename = "NRC_MoveL")]
    NrcMoveL(NrcAckResponse),

    #[serde(rename = "NRC_MoveLWeave")]
    NrcMoveLWeave(NrcAckResponse),

    #[serde(rename = "NRC_JobStop")]
    NrcJobStop(NrcAckResponse),

    #[serde(rename = "NRC_ReadPosition")]
    NrcReadPosition(NrcReadPositionResponse),

    // controller could not parse the request
    #[serde(rename = "NRC_Unknown")]
    NrcUnknown(NrcAckResponse),
}

impl CommandResponse {
    /// Builds the plain acknowledgement matching `command`.
    ///
    /// Commands whose reply carries data (`NRC_GetStatus`, `NRC_ClearError`,
    /// `NRC_ReadPosition`) have no plain form and yield `NRC_Unknown`.
    pub fn ack_for(command: &Command, error_id: u32) -> Self {
        let ack = NrcAckResponse::new(command.get_sequence_id(), error_id);
        match command {
            Command::NrcSetServoState(_) => CommandResponse::NrcSetServoState(ack),
            Command::NrcServoPowerOn(_) => CommandResponse::NrcServoPowerOn(ack),
            Command::NrcServoPowerOff(_) => CommandResponse::NrcServoPowerOff(ack),
            Command::NrcSetSpeed(_) => CommandResponse::NrcSetSpeed(ack),
            Command::NrcSetCoord(_) => CommandResponse::NrcSetCoord(ack),
            Command::NrcSetMode(_) => CommandResponse::NrcSetMode(ack),
            Command::NrcSetToolFrame(_) => CommandResponse::NrcSetToolFrame(ack),
            Command::NrcSetUserFrame(_) => CommandResponse::NrcSetUserFrame(ack),
            Command::NrcWriteToolParam(_) => CommandResponse::NrcWriteToolParam(ack),
            Command::NrcStartJog(_) => CommandResponse::NrcStartJog(ack),
            Command::NrcStopJog(_) => CommandResponse::NrcStopJog(ack),
            Command::NrcGoHome(_) => CommandResponse::NrcGoHome(ack),
            Command::NrcGoResetPosition(_) => CommandResponse::NrcGoResetPosition(ack),
            Command::NrcMoveJ(_) => CommandResponse::NrcMoveJ(ack),
            Command::NrcMoveL(_) => CommandResponse::NrcMoveL(ack),
            Command::NrcMoveLWeave(_) => CommandResponse::NrcMoveLWeave(ack),
            Command::NrcJobStop(_) => CommandResponse::NrcJobStop(ack),
            Command::NrcGetStatus(_) | Command::NrcClearError(_) | Command::NrcReadPosition(_) => {
                CommandResponse::NrcUnknown(ack)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandResponse::NrcGetStatus(_) => "NRC_GetStatus",
            CommandResponse::NrcSetServoState(_) => "NRC_SetServoState",
            CommandResponse::NrcServoPowerOn(_) => "NRC_ServoPowerOn",
            CommandResponse::NrcServoPowerOff(_) => "NRC_ServoPowerOff",
            CommandResponse::NrcClearError(_) => "NRC_ClearError",
            CommandResponse::NrcSetSpeed(_) => "NRC_SetSpeed",
            CommandResponse::NrcSetCoord(_) => "NRC_SetCoord",
            CommandResponse::NrcSetMode(_) => "NRC_SetMode",
            CommandResponse::NrcSetToolFrame(_) => "NRC_SetToolFrame",
            CommandResponse::NrcSetUserFrame(_) => "NRC_SetUserFrame",
            CommandResponse::NrcWriteToolParam(_) => "NRC_WriteToolParam",
            CommandResponse::NrcStartJog(_) => "NRC_StartJog",
            CommandResponse::NrcStopJog(_) => "NRC_StopJog",
            CommandResponse::NrcGoHome(_) => "NRC_GoHome",
            CommandResponse::NrcGoResetPosition(_) => "NRC_GoResetPosition",
            CommandResponse::NrcMoveJ(_) => "NRC_MoveJ",
            CommandResponse::NrcMoveL(_) => "NRC_MoveL",
            CommandResponse::NrcMoveLWeave(_) => "NRC_MoveLWeave",
            CommandResponse::NrcJobStop(_) => "NRC_JobStop",
            CommandResponse::NrcReadPosition(_) => "NRC_ReadPosition",
            CommandResponse::NrcUnknown(_) => "NRC_Unknown",
        }
    }

    pub fn get_sequence_id(&self) -> u32 {
        match self {
            CommandResponse::NrcGetStatus(resp) => resp.sequence_id,
            CommandResponse::NrcClearError(resp) => resp.sequence_id,
            CommandResponse::NrcReadPosition(resp) => resp.sequence_id,
            CommandResponse::NrcSetServoState(resp)
            | CommandResponse::NrcServoPowerOn(resp)
            | CommandResponse::NrcServoPowerOff(resp)
            | CommandResponse::NrcSetSpeed(resp)
            | CommandResponse::NrcSetCoord(resp)
            | CommandResponse::NrcSetMode(resp)
            | CommandResponse::NrcSetToolFrame(resp)
            | CommandResponse::NrcSetUserFrame(resp)
            | CommandResponse::NrcWriteToolParam(resp)
            | CommandResponse::NrcStartJog(resp)
            | CommandResponse::NrcStopJog(resp)
            | CommandResponse::NrcGoHome(resp)
            | CommandResponse::NrcGoResetPosition(resp)
            | CommandResponse::NrcMoveJ(resp)
            | CommandResponse::NrcMoveL(resp)
            | CommandResponse::NrcMoveLWeave(resp)
            | CommandResponse::NrcJobStop(resp)
            | CommandResponse::NrcUnknown(resp) => resp.sequence_id,
        }
    }

    pub fn get_error_id(&self) -> u32 {
        match self {
            CommandResponse::NrcGetStatus(resp) => resp.error_id,
            CommandResponse::NrcClearError(resp) => resp.error_id,
            CommandResponse::NrcReadPosition(resp) => resp.error_id,
            CommandResponse::NrcSetServoState(resp)
            | CommandResponse::NrcServoPowerOn(resp)
            | CommandResponse::NrcServoPowerOff(resp)
            | CommandResponse::NrcSetSpeed(resp)
            | CommandResponse::NrcSetCoord(resp)
            | CommandResponse::NrcSetMode(resp)
            | CommandResponse::NrcSetToolFrame(resp)
            | CommandResponse::NrcSetUserFrame(resp)
            | CommandResponse::NrcWriteToolParam(resp)
            | CommandResponse::NrcStartJog(resp)
            | CommandResponse::NrcStopJog(resp)
            | CommandResponse::NrcGoHome(resp)
            | CommandResponse::NrcGoResetPosition(resp)
            | CommandResponse::NrcMoveJ(resp)
            | CommandResponse::NrcMoveL(resp)
            | CommandResponse::NrcMoveLWeave(resp)
            | CommandResponse::NrcJobStop(resp)
            | CommandResponse::NrcUnknown(resp) => resp.error_id,
        }
    }
}

// ExtractInner trait implementations for the responses that carry data
impl_extract_inner!(CommandResponse, NrcGetStatus, NrcGetStatusResponse);
impl_extract_inner!(CommandResponse, NrcClearError, NrcClearErrorResponse);
impl_extract_inner!(CommandResponse, NrcReadPosition, NrcReadPositionResponse);
