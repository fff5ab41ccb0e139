use serde::{Deserialize, Serialize};

/// Direct servo setter; `State` is `0` (off) or `1` (on).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcSetServoState {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "State")]
    pub state: u8,
}

impl NrcSetServoState {
    pub fn new(state: u8) -> Self {
        Self {
            sequence_id: 0,
            state,
        }
    }
}
