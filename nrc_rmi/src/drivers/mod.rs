#[cfg(feature="driver")]
mod driver;
#[cfg(feature="driver")]
pub use driver::*;

#[cfg(feature="driver")]
mod transport;
#[cfg(feature="driver")]
pub use transport::*;

mod driver_config;
pub use driver_config::*;
