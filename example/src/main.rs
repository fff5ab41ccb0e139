//! Console teach pendant.
//!
//! `example [IP] [PORT] [NAME]` connects, then reads one command per line:
//!
//! ```text
//! on | off | clear | stop | home | reset | status
//! speed <1..100> | speed +N | speed -N
//! joint <1..6> <+|-> | linear <x|y|z> <+|->
//! pos [0..3]
//! save | insert <after> | edit <n> | delete <n> | list | run
//! quit
//! ```

use std::sync::Arc;

use nrc_rmi::program::{Program, StepMotion};
use nrc_rmi::registry::{RegistryConfig, SessionRegistry};
use nrc_rmi::session::RobotSession;
use nrc_rmi::{CoordFrame, NrcError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const JOINT_STEP_DEG: f64 = 10.0;
const LINEAR_STEP_MM: f64 = 50.0;
const ACC: f64 = 30.0;
const DEC: f64 = 30.0;

struct Pendant {
    session: Arc<RobotSession>,
    program: Program,
    /// Velocity used by jogs and program runs, 1..=100.
    speed: i32,
}

impl Pendant {
    fn direction(arg: Option<&str>) -> Result<f64, NrcError> {
        match arg {
            Some("+") => Ok(1.0),
            Some("-") => Ok(-1.0),
            other => Err(NrcError::InvalidArgument(format!(
                "direction must be + or -, got {other:?}"
            ))),
        }
    }

    fn number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T, NrcError> {
        arg.and_then(|a| a.parse().ok())
            .ok_or_else(|| NrcError::InvalidArgument(format!("expected {what}")))
    }

    async fn print_position(&self, coord: CoordFrame) -> Result<(), NrcError> {
        let sample = self.session.get_current_position(coord).await?;
        let marker = if sample.stale { " (cached)" } else { "" };
        println!("{:?}: {:?}{}", coord, sample.position, marker);
        Ok(())
    }

    fn list(&self) {
        if self.program.is_empty() {
            println!("program is empty");
        }
        for step in self.program.steps() {
            println!("step {:>3}: {:?}", step.number, step.pose);
        }
    }

    async fn execute(&mut self, line: &str) -> Result<bool, NrcError> {
        let mut args = line.split_whitespace();
        let Some(command) = args.next() else {
            return Ok(true);
        };
        match command {
            "on" => self.session.set_servo_poweron().await?,
            "off" => self.session.set_servo_poweroff().await?,
            "clear" => self.session.clear_error().await?,
            "stop" => self.session.job_stop().await?,
            "home" => self.session.robot_go_home().await?,
            "reset" => self.session.robot_go_to_reset_position().await?,
            "status" => {
                let snapshot = self.session.snapshot().await;
                println!(
                    "{} state={} servo={:?} speed={} coord={:?} mode={:?}",
                    snapshot.name,
                    snapshot.state,
                    snapshot.servo_status,
                    snapshot.speed,
                    snapshot.coord,
                    snapshot.mode
                );
            }
            "speed" => {
                let arg = args.next().unwrap_or_default();
                let speed = match arg.strip_prefix('+') {
                    Some(delta) => self.speed + Self::number::<i32>(Some(delta), "a speed step")?,
                    None if arg.starts_with('-') => {
                        self.speed + Self::number::<i32>(Some(arg), "a speed step")?
                    }
                    None => Self::number(Some(arg), "a speed")?,
                };
                let speed = speed.clamp(1, 100);
                self.session.set_speed(speed).await?;
                self.speed = speed;
                println!("speed {speed}");
            }
            "joint" => {
                let joint: usize = Self::number(args.next(), "a joint 1..6")?;
                let delta = JOINT_STEP_DEG * Self::direction(args.next())?;
                if joint == 0 {
                    return Err(NrcError::InvalidArgument("joints are numbered from 1".to_string()));
                }
                self.session
                    .move_joint_relative(joint - 1, delta, self.speed as f64, ACC, DEC)
                    .await?;
                self.print_position(CoordFrame::Joint).await?;
            }
            "linear" => {
                let axis = match args.next() {
                    Some("x") => 0,
                    Some("y") => 1,
                    Some("z") => 2,
                    other => {
                        return Err(NrcError::InvalidArgument(format!(
                            "axis must be x, y or z, got {other:?}"
                        )))
                    }
                };
                let delta = LINEAR_STEP_MM * Self::direction(args.next())?;
                let velocity = (self.speed * 5) as f64;
                self.session
                    .linear_step(axis, delta, velocity, ACC, DEC)
                    .await?;
                self.print_position(CoordFrame::Cartesian).await?;
            }
            "pos" => {
                let coord = match args.next() {
                    Some(arg) => CoordFrame::try_from(Self::number::<i32>(Some(arg), "a coord")?)?,
                    None => self.session.get_current_coord().await,
                };
                self.print_position(coord).await?;
            }
            "save" => {
                let number = self.program.record(&self.session).await?;
                println!("saved step {number}");
            }
            "insert" => {
                let after: usize = Self::number(args.next(), "a step number")?;
                let number = self.program.record_after(&self.session, Some(after)).await?;
                println!("inserted step {number}");
            }
            "edit" => {
                let number: usize = Self::number(args.next(), "a step number")?;
                self.program.rerecord(&self.session, number).await?;
                println!("step {number} updated");
            }
            "delete" => {
                let number: usize = Self::number(args.next(), "a step number")?;
                self.program.remove(number)?;
                self.list();
            }
            "list" => self.list(),
            "run" => {
                self.program.motion.velocity = self.speed as f64;
                let program = self.program.clone();
                let session = self.session.clone();
                // runs in the background so `stop` stays available
                tokio::spawn(async move {
                    let report = program.run(&session).await;
                    match report.error {
                        None => println!("program done, {} steps", report.total),
                        Some(e) => println!(
                            "program stopped after {}/{} steps: {}",
                            report.completed, report.total, e
                        ),
                    }
                });
            }
            "quit" | "exit" => return Ok(false),
            other => println!("unknown command `{other}`"),
        }
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> Result<(), NrcError> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let ip = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.next().unwrap_or_else(|| "6001".to_string());
    let name = args.next().unwrap_or_else(|| "robot".to_string());

    let registry = SessionRegistry::new(RegistryConfig::default());
    let session = match registry.connect(&name, &ip, &port).await {
        Ok(session) => session,
        Err(e) => {
            println!("Failed to connect to {ip}:{port} : {e}");
            return Err(e);
        }
    };
    info!(robot = %name, "connected");

    let mut pendant = Pendant {
        session,
        program: Program::new(StepMotion::default()),
        speed: 50,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin closed: {}", e);
                break;
            }
        };
        match pendant.execute(line.trim()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("error ({}): {}", e.status_code().code(), e),
        }
    }

    registry.shutdown().await;
    Ok(())
}
