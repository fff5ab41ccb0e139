mod nrc_error;
mod status_code;

pub use nrc_error::*;
pub use status_code::*;
