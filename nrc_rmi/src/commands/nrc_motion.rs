use serde::{Deserialize, Serialize};

use crate::{MoveCmd, WaveParam};

/// Body of `NRC_MoveJ` and `NRC_MoveL`: the move request fields sit next to the
/// sequence number.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NrcMotion {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(flatten)]
    pub motion: MoveCmd,
}

impl NrcMotion {
    pub fn new(motion: MoveCmd) -> Self {
        Self {
            sequence_id: 0,
            motion,
        }
    }
}

/// Body of `NRC_MoveLWeave`: a linear move with a weave overlay.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NrcWeaveMotion {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(flatten)]
    pub motion: MoveCmd,
    #[serde(rename = "Wave")]
    pub wave: WaveParam,
}

impl NrcWeaveMotion {
    pub fn new(motion: MoveCmd, wave: WaveParam) -> Self {
        Self {
            sequence_id: 0,
            motion,
            wave,
        }
    }
}
