use serde::{Deserialize, Serialize};

/// Reply to `NRC_ClearError`; `ServoStatus` is the drive state after the reset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcClearErrorResponse {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
    #[serde(rename = "ServoStatus")]
    pub servo_status: u8,
}
