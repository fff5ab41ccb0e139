//! Taught-point programs.
//!
//! A program is an ordered list of joint poses recorded from the robot. Steps
//! are numbered from 1 by position, so inserting or removing a step renumbers
//! everything after it. Running a program issues one `movej` per step.

use serde::{Deserialize, Serialize};

use crate::{NrcError, Pose};

/// One numbered step as shown to an operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub number: usize,
    pub pose: Pose,
}

/// Motion parameters used for every step of a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct StepMotion {
    pub velocity: f64,
    pub acc: f64,
    pub dec: f64,
}

impl Default for StepMotion {
    fn default() -> Self {
        Self {
            velocity: 50.0,
            acc: 30.0,
            dec: 30.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Program {
    steps: Vec<Pose>,
    pub motion: StepMotion,
}

impl Program {
    pub fn new(motion: StepMotion) -> Self {
        Self {
            steps: Vec::new(),
            motion,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step by 1-based number.
    pub fn step(&self, number: usize) -> Option<Step> {
        let index = number.checked_sub(1)?;
        self.steps.get(index).map(|pose| Step {
            number,
            pose: *pose,
        })
    }

    pub fn steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps.iter().enumerate().map(|(i, pose)| Step {
            number: i + 1,
            pose: *pose,
        })
    }

    /// Appends a step and returns its number.
    pub fn push(&mut self, pose: Pose) -> usize {
        self.steps.push(pose);
        self.steps.len()
    }

    /// `Some(n)` places the new step at number `n + 1` (`Some(0)` is the top);
    /// `None` appends. Returns the new step's number.
    pub fn insert_after(&mut self, after: Option<usize>, pose: Pose) -> Result<usize, NrcError> {
        match after {
            None => Ok(self.push(pose)),
            Some(n) if n <= self.steps.len() => {
                self.steps.insert(n, pose);
                Ok(n + 1)
            }
            Some(n) => Err(self.no_step(n)),
        }
    }

    pub fn replace(&mut self, number: usize, pose: Pose) -> Result<Pose, NrcError> {
        let index = self.index_of(number)?;
        Ok(std::mem::replace(&mut self.steps[index], pose))
    }

    pub fn remove(&mut self, number: usize) -> Result<Pose, NrcError> {
        let index = self.index_of(number)?;
        Ok(self.steps.remove(index))
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    fn index_of(&self, number: usize) -> Result<usize, NrcError> {
        match number.checked_sub(1) {
            Some(index) if index < self.steps.len() => Ok(index),
            _ => Err(self.no_step(number)),
        }
    }

    fn no_step(&self, number: usize) -> NrcError {
        NrcError::InvalidArgument(format!(
            "program has {} steps, no step {number}",
            self.steps.len()
        ))
    }
}

/// Outcome of [`Program::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub completed: usize,
    pub total: usize,
    /// Error of the step that stopped the run, if any.
    pub error: Option<NrcError>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.completed == self.total
    }
}

#[cfg(feature = "driver")]
mod run {
    use tracing::{info, warn};

    use super::{Program, RunReport};
    use crate::session::RobotSession;
    use crate::{CoordFrame, MoveCmd, NrcError};

    impl Program {
        /// Appends the robot's current joint pose.
        pub async fn record(&mut self, session: &RobotSession) -> Result<usize, NrcError> {
            let pose = session.current_pose(CoordFrame::Joint).await?;
            Ok(self.push(pose))
        }

        /// Inserts the robot's current joint pose below step `after`.
        pub async fn record_after(
            &mut self,
            session: &RobotSession,
            after: Option<usize>,
        ) -> Result<usize, NrcError> {
            let pose = session.current_pose(CoordFrame::Joint).await?;
            self.insert_after(after, pose)
        }

        /// Overwrites step `number` with the robot's current joint pose.
        pub async fn rerecord(&mut self, session: &RobotSession, number: usize) -> Result<(), NrcError> {
            let pose = session.current_pose(CoordFrame::Joint).await?;
            self.replace(number, pose).map(|_| ())
        }

        /// Runs every step in order with a joint move, stopping at the first failure.
        pub async fn run(&self, session: &RobotSession) -> RunReport {
            let total = self.len();
            info!(robot = session.name(), steps = total, "program started");
            for step in self.steps() {
                let cmd = MoveCmd::new(
                    step.pose,
                    CoordFrame::Joint,
                    self.motion.velocity,
                    self.motion.acc,
                    self.motion.dec,
                );
                if let Err(e) = session.robot_movej(cmd).await {
                    warn!(robot = session.name(), step = step.number, "program stopped: {}", e);
                    return RunReport {
                        completed: step.number - 1,
                        total,
                        error: Some(e),
                    };
                }
            }
            info!(robot = session.name(), "program complete");
            RunReport {
                completed: total,
                total,
                error: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(v: f64) -> Pose {
        [v; crate::AXIS_COUNT]
    }

    #[test]
    fn steps_renumber_after_insert_and_remove() {
        let mut program = Program::default();
        program.push(pose(1.0));
        program.push(pose(3.0));
        assert_eq!(program.insert_after(Some(1), pose(2.0)).unwrap(), 2);

        let numbered: Vec<(usize, f64)> = program.steps().map(|s| (s.number, s.pose[0])).collect();
        assert_eq!(numbered, vec![(1, 1.0), (2, 2.0), (3, 3.0)]);

        assert_eq!(program.remove(1).unwrap(), pose(1.0));
        assert_eq!(program.step(1).unwrap().pose, pose(2.0));
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn insert_at_top_and_bottom() {
        let mut program = Program::default();
        program.push(pose(1.0));
        assert_eq!(program.insert_after(Some(0), pose(0.0)).unwrap(), 1);
        assert_eq!(program.insert_after(None, pose(2.0)).unwrap(), 3);
        assert!(program.insert_after(Some(9), pose(9.0)).is_err());
    }

    #[test]
    fn out_of_range_steps_are_rejected() {
        let mut program = Program::default();
        assert!(program.remove(0).is_err());
        assert!(program.replace(1, pose(0.0)).is_err());
        assert!(program.step(0).is_none());
    }
}
