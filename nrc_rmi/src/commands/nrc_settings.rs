use serde::{Deserialize, Serialize};

use crate::{CoordFrame, RobotMode, ToolParam};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcSetSpeed {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "Speed")]
    pub speed: u8,
}

impl NrcSetSpeed {
    pub fn new(speed: u8) -> Self {
        Self {
            sequence_id: 0,
            speed,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcSetCoord {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "Coord")]
    pub coord: CoordFrame,
}

impl NrcSetCoord {
    pub fn new(coord: CoordFrame) -> Self {
        Self {
            sequence_id: 0,
            coord,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcSetMode {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "Mode")]
    pub mode: RobotMode,
}

impl NrcSetMode {
    pub fn new(mode: RobotMode) -> Self {
        Self {
            sequence_id: 0,
            mode,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcSetToolFrame {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "ToolNum")]
    pub tool_num: i32,
}

impl NrcSetToolFrame {
    pub fn new(tool_num: i32) -> Self {
        Self {
            sequence_id: 0,
            tool_num,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcSetUserFrame {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "UserNum")]
    pub user_num: i32,
}

impl NrcSetUserFrame {
    pub fn new(user_num: i32) -> Self {
        Self {
            sequence_id: 0,
            user_num,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NrcWriteToolParam {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "ToolNum")]
    pub tool_num: i32,
    #[serde(rename = "Param")]
    pub param: ToolParam,
}

impl NrcWriteToolParam {
    pub fn new(tool_num: i32, param: ToolParam) -> Self {
        Self {
            sequence_id: 0,
            tool_num,
            param,
        }
    }
}
