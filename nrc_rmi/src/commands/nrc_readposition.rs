use serde::{Deserialize, Serialize};

use crate::{CoordFrame, Pose};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcReadPosition {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "Coord")]
    pub coord: CoordFrame,
}

impl NrcReadPosition {
    pub fn new(coord: CoordFrame) -> Self {
        Self {
            sequence_id: 0,
            coord,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NrcReadPositionResponse {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
    #[serde(rename = "Coord")]
    pub coord: CoordFrame,
    #[serde(rename = "Position")]
    pub position: Pose,
}
