use serde::{Deserialize, Serialize};

/// Connection-level packets exchanged outside the sequenced command stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "Communication")]
pub enum Communication {
    #[serde(rename = "NRC_Connect")]
    NrcConnect(NrcConnect),
    #[serde(rename = "NRC_Disconnect")]
    NrcDisconnect,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcConnect {
    #[serde(rename = "RobotName")]
    pub robot_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "Communication")]
pub enum CommunicationResponse {
    #[serde(rename = "NRC_Connect")]
    NrcConnect(NrcConnectResponse),
    #[serde(rename = "NRC_Disconnect")]
    NrcDisconnect(NrcDisconnectResponse),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcConnectResponse {
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
    #[serde(rename = "MajorVersion")]
    pub major_version: u16,
    #[serde(rename = "MinorVersion")]
    pub minor_version: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NrcDisconnectResponse {
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
}
