use serde::{Deserialize, Serialize};

use crate::{CoordFrame, RobotMode};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcGetStatusResponse {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
    #[serde(rename = "ServoStatus")]
    pub servo_status: u8,
    #[serde(rename = "Speed")]
    pub speed: u8,
    #[serde(rename = "Coord")]
    pub coord: CoordFrame,
    #[serde(rename = "Mode")]
    pub mode: RobotMode,
    #[serde(rename = "ToolNum")]
    pub tool_num: u8,
    #[serde(rename = "UserNum")]
    pub user_num: u8,
}
