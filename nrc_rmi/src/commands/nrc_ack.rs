use serde::{Deserialize, Serialize};

/// Request body for commands that carry nothing but their sequence number
/// (power on/off, go home, job stop, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct NrcBareCommand {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
}

/// Plain acknowledgement returned for every command without a data payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcAckResponse {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
}

impl NrcAckResponse {
    pub fn new(sequence_id: u32, error_id: u32) -> Self {
        Self {
            sequence_id,
            error_id,
        }
    }
}
