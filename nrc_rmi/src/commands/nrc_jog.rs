use serde::{Deserialize, Serialize};

use crate::JogDirection;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcStartJog {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "Axis")]
    pub axis: u8,
    #[serde(rename = "Direction")]
    pub direction: JogDirection,
}

impl NrcStartJog {
    pub fn new(axis: u8, direction: JogDirection) -> Self {
        Self {
            sequence_id: 0,
            axis,
            direction,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcStopJog {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "Axis")]
    pub axis: u8,
}

impl NrcStopJog {
    pub fn new(axis: u8) -> Self {
        Self {
            sequence_id: 0,
            axis,
        }
    }
}
