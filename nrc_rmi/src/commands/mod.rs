mod nrc_ack;
mod nrc_clearerror;
mod nrc_getstatus;
mod nrc_jog;
mod nrc_motion;
mod nrc_readposition;
mod nrc_servo;
mod nrc_settings;

pub use nrc_ack::*;
pub use nrc_clearerror::*;
pub use nrc_getstatus::*;
pub use nrc_jog::*;
pub use nrc_motion::*;
pub use nrc_readposition::*;
pub use nrc_servo::*;
pub use nrc_settings::*;
