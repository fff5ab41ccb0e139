mod command;
mod communication;

pub use command::*;
pub use communication::*;

use serde::{Deserialize, Serialize};

/// Anything the driver writes to the controller socket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SendPacket {
    Communication(Communication),
    Command(Command),
}

/// Anything the controller writes back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ResponsePacket {
    CommunicationResponse(CommunicationResponse),
    CommandResponse(CommandResponse),
}

pub trait Packet: Serialize + for<'de> Deserialize<'de> {
    /// Serializes the packet as one protocol line, terminator included.
    fn to_line(&self) -> Result<String, serde_json::Error> {
        Ok(serde_json::to_string(self)? + "\r\n")
    }
}

impl Packet for SendPacket {}
impl Packet for ResponsePacket {}
impl Packet for Command {}
impl Packet for CommandResponse {}
impl Packet for Communication {}
impl Packet for CommunicationResponse {}
