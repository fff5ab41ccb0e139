//! Caller-supplied parameter blocks: motion requests, tool frames and weave overlays.
//!
//! These are plain values. They are checked by the
//! [`dispatcher`](crate::dispatcher) before anything is sent to the controller.

use serde::{Deserialize, Serialize};

use crate::{CoordFrame, NrcError, Pose, AXIS_COUNT};

/// Number of tool frames and user frames the controller exposes (indices `0..10`).
pub const FRAME_COUNT: i32 = 10;

/// One motion request.
///
/// `pl` is the blend radius used when chaining segments; the controller owns its
/// meaning, only its sign is checked here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct MoveCmd {
    #[serde(rename = "Position")]
    pub pos: Pose,
    pub coord: CoordFrame,
    pub velocity: f64,
    pub acc: f64,
    pub dec: f64,
    pub pl: i32,
    pub tool_num: i32,
    pub user_num: i32,
}

impl MoveCmd {
    pub fn new(pos: Pose, coord: CoordFrame, velocity: f64, acc: f64, dec: f64) -> Self {
        Self {
            pos,
            coord,
            velocity,
            acc,
            dec,
            pl: 0,
            tool_num: 0,
            user_num: 0,
        }
    }

    /// Builds a request from up to seven axis values; missing axes are zero.
    pub fn from_slice(
        values: &[f64],
        coord: CoordFrame,
        velocity: f64,
        acc: f64,
        dec: f64,
    ) -> Result<Self, NrcError> {
        Ok(Self::new(pose_from_slice(values)?, coord, velocity, acc, dec))
    }

    pub fn with_blend(mut self, pl: i32) -> Self {
        self.pl = pl;
        self
    }

    pub fn with_frames(mut self, tool_num: i32, user_num: i32) -> Self {
        self.tool_num = tool_num;
        self.user_num = user_num;
        self
    }
}

/// Pads a short axis list with zeros. More than [`AXIS_COUNT`] values is rejected.
pub fn pose_from_slice(values: &[f64]) -> Result<Pose, NrcError> {
    if values.len() > AXIS_COUNT {
        return Err(NrcError::InvalidArgument(format!(
            "a pose has at most {AXIS_COUNT} axes, got {}",
            values.len()
        )));
    }
    let mut pose = [0.0; AXIS_COUNT];
    pose[..values.len()].copy_from_slice(values);
    Ok(pose)
}

/// Tool-frame offset plus payload description.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ToolParam {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C")]
    pub c: f64,
    pub payload_mass: f64,
    pub payload_inertia: f64,
    #[serde(rename = "PayloadMassCenterX")]
    pub payload_mass_center_x: f64,
    #[serde(rename = "PayloadMassCenterY")]
    pub payload_mass_center_y: f64,
    #[serde(rename = "PayloadMassCenterZ")]
    pub payload_mass_center_z: f64,
}

/// Weave overlay applied on top of a linear move.
///
/// `wave_type` selects the controller's weave pattern (0..=3); the pattern
/// semantics belong to the controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct WaveParam {
    #[serde(rename = "Type")]
    pub wave_type: i32,
    pub swing_freq: f64,
    pub swing_amplitude: f64,
    pub radius: f64,
    #[serde(rename = "LTypeAngle")]
    pub l_type_angle: f64,
    pub move_when_edge_stay: bool,
    pub left_stay_time: f64,
    pub right_stay_time: f64,
    pub initial_dir: i32,
    pub horizontal_deflection: f64,
    pub vertical_deflection: f64,
}
