//! Behaviour knobs for the simulated controller.

use std::path::Path;

use nrc_rmi::{Pose, AXIS_COUNT};
use serde::{Deserialize, Serialize};

/// What the simulator reports and how long it takes to move.
///
/// Joint limits are symmetric, in degrees. A joint-space move outside them
/// faults the servo with `JointLimitExceeded` the way a real controller does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub major_version: u16,
    pub minor_version: u16,
    /// Simulated travel time of every motion command.
    pub motion_duration_ms: u64,
    pub joint_limits: Pose,
    pub home: Pose,
    pub reset_position: Pose,
    /// Cartesian pose reported before anything has moved.
    pub initial_cartesian: Pose,
    /// Reads requests but never answers commands.
    pub unresponsive: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            major_version: 1,
            minor_version: 0,
            motion_duration_ms: 100,
            joint_limits: [170.0, 135.0, 150.0, 190.0, 125.0, 360.0, 360.0],
            home: [0.0; AXIS_COUNT],
            reset_position: [0.0, 0.0, 90.0, 0.0, -90.0, 0.0, 0.0],
            initial_cartesian: [400.0, 0.0, 500.0, 180.0, 0.0, 0.0, 0.0],
            unresponsive: false,
        }
    }
}

impl RobotConfig {
    /// Reads a JSON file; missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_motion_duration(mut self, ms: u64) -> Self {
        self.motion_duration_ms = ms;
        self
    }

    /// Index of the first joint outside its limit.
    pub fn joint_limit_violation(&self, joints: &Pose) -> Option<usize> {
        joints
            .iter()
            .zip(self.joint_limits.iter())
            .position(|(value, limit)| value.abs() > *limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_symmetric() {
        let config = RobotConfig::default();
        assert_eq!(config.joint_limit_violation(&[0.0; AXIS_COUNT]), None);
        let mut joints = [0.0; AXIS_COUNT];
        joints[1] = -136.0;
        assert_eq!(config.joint_limit_violation(&joints), Some(1));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RobotConfig = serde_json::from_str(r#"{"motion_duration_ms": 5}"#).unwrap();
        assert_eq!(config.motion_duration_ms, 5);
        assert_eq!(config.major_version, 1);
        assert!(!config.unresponsive);
    }
}
