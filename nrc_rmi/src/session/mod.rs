//! Per-robot state machine.
//!
//! ```text
//! Disconnected -> Connecting -> Idle <-> PoweredOn <-> Running
//!                                 \         |           |
//!                                  `------- Error <-----'
//! ```
//!
//! `clear_error` is the only way out of `Error`; `job_stop` forces `Idle` from
//! any connected state except `Error`.

mod robot_session;
mod state;

pub use robot_session::RobotSession;
pub use state::{PositionSample, SessionSnapshot};
