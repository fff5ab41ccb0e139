//! Cached per-robot state guarded by the session's state lock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::commands::NrcGetStatusResponse;
use crate::{
    CoordFrame, NrcError, Pose, RobotMode, ServoStatus, SessionState, ToolParam, WaveParam,
    AXIS_COUNT,
};

/// Position returned by `get_current_position`.
///
/// `stale` is set when the controller did not answer in time and the value
/// comes from the cache. `sampled_at` is `None` if nothing was ever sampled for
/// this coord, in which case `position` is all zeros.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PositionSample {
    pub position: Pose,
    pub coord: CoordFrame,
    pub stale: bool,
    pub sampled_at: Option<SystemTime>,
}

impl PositionSample {
    pub fn fresh(coord: CoordFrame, position: Pose) -> Self {
        Self {
            position,
            coord,
            stale: false,
            sampled_at: Some(SystemTime::now()),
        }
    }

    pub fn empty(coord: CoordFrame) -> Self {
        Self {
            position: [0.0; AXIS_COUNT],
            coord,
            stale: true,
            sampled_at: None,
        }
    }
}

/// Consistent copy of everything the session caches.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub name: String,
    pub state: SessionState,
    pub servo_status: ServoStatus,
    pub speed: u8,
    pub coord: CoordFrame,
    pub mode: RobotMode,
    pub tool_num: i32,
    pub user_num: i32,
    pub jogging_axes: Vec<u8>,
    pub positions: Vec<PositionSample>,
    pub tool_params: BTreeMap<i32, ToolParam>,
    pub weave: Option<WaveParam>,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionInner {
    pub state: SessionState,
    pub speed: u8,
    pub coord: CoordFrame,
    pub mode: RobotMode,
    pub tool_num: i32,
    pub user_num: i32,
    pub jogging: BTreeSet<u8>,
    pub positions: HashMap<CoordFrame, PositionSample>,
    /// Bumped whenever a motion rewrites the position cache.
    pub cache_generation: u64,
    pub tool_params: BTreeMap<i32, ToolParam>,
    pub weave: Option<WaveParam>,
}

impl Default for SessionInner {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            speed: 100,
            coord: CoordFrame::default(),
            mode: RobotMode::default(),
            tool_num: 0,
            user_num: 0,
            jogging: BTreeSet::new(),
            positions: HashMap::new(),
            cache_generation: 0,
            tool_params: BTreeMap::new(),
            weave: None,
        }
    }
}

impl SessionInner {
    /// Connected and in one of `allowed`.
    pub fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<(), NrcError> {
        self.require_link()?;
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(NrcError::InvalidTransition {
                operation,
                state: self.state,
            })
        }
    }

    pub fn require_link(&self) -> Result<(), NrcError> {
        if self.state == SessionState::Disconnected {
            Err(NrcError::ConnectionLost("session is disconnected".to_string()))
        } else {
            Ok(())
        }
    }

    /// Configuration may change in `Idle` and `PoweredOn` only.
    pub fn require_configurable(&self, operation: &'static str) -> Result<(), NrcError> {
        self.require_link()?;
        match self.state {
            SessionState::Idle | SessionState::PoweredOn => Ok(()),
            SessionState::Running => Err(NrcError::Busy("robot is running")),
            state => Err(NrcError::InvalidTransition { operation, state }),
        }
    }

    /// Leaves nothing in motion: jog set and weave overlay are dropped.
    pub fn halt(&mut self, state: SessionState) {
        self.state = state;
        self.jogging.clear();
        self.weave = None;
    }

    /// A motion the controller reports as running was not started by this
    /// session, so it is adopted as `PoweredOn` rather than `Running`.
    pub fn apply_status(&mut self, status: &NrcGetStatusResponse) {
        let servo = ServoStatus::try_from(status.servo_status).unwrap_or_default();
        self.state = match SessionState::from_servo_status(servo) {
            SessionState::Running => SessionState::PoweredOn,
            state => state,
        };
        self.speed = status.speed;
        self.coord = status.coord;
        self.mode = status.mode;
        self.tool_num = status.tool_num as i32;
        self.user_num = status.user_num as i32;
    }

    pub fn cached_position(&self, coord: CoordFrame) -> PositionSample {
        match self.positions.get(&coord) {
            Some(sample) => PositionSample {
                stale: true,
                ..sample.clone()
            },
            None => PositionSample::empty(coord),
        }
    }

    /// After a completed move only the commanded frame is known.
    pub fn record_arrival(&mut self, coord: CoordFrame, position: Pose) {
        self.forget_positions();
        self.positions
            .insert(coord, PositionSample::fresh(coord, position));
    }

    pub fn forget_positions(&mut self) {
        self.positions.clear();
        self.cache_generation += 1;
    }

    /// Caches a reading unless a motion rewrote the cache after the read was sent.
    pub fn record_reading(&mut self, generation: u64, sample: &PositionSample) -> bool {
        if generation != self.cache_generation {
            return false;
        }
        self.positions.insert(sample.coord, sample.clone());
        true
    }

    pub fn snapshot(&self, name: &str) -> SessionSnapshot {
        let mut positions: Vec<PositionSample> = self.positions.values().cloned().collect();
        positions.sort_by_key(|sample| sample.coord);
        SessionSnapshot {
            name: name.to_string(),
            state: self.state,
            servo_status: self.state.servo_status(),
            speed: self.speed,
            coord: self.coord,
            mode: self.mode,
            tool_num: self.tool_num,
            user_num: self.user_num,
            jogging_axes: self.jogging.iter().copied().collect(),
            positions,
            tool_params: self.tool_params.clone(),
            weave: self.weave,
        }
    }
}
