//! The session core driven over real TCP against the simulator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nrc_rmi::drivers::{NrcDriver, NrcDriverConfig, Transport};
use nrc_rmi::packets::{Command, CommandResponse};
use nrc_rmi::program::{Program, StepMotion};
use nrc_rmi::registry::{RegistryConfig, SessionRegistry};
use nrc_rmi::session::RobotSession;
use nrc_rmi::{
    CoordFrame, JogDirection, MoveCmd, NrcError, ServoStatus, SessionState, StatusCode,
};
use sim::{RobotConfig, Simulator};

fn registry() -> SessionRegistry {
    SessionRegistry::new(RegistryConfig {
        driver: NrcDriverConfig {
            connect_retries: 1,
            retry_delay_ms: 10,
            connect_timeout_ms: 1000,
            command_timeout_ms: 500,
            motion_timeout_ms: 10_000,
            position_timeout_ms: 100,
            ..NrcDriverConfig::default()
        },
    })
}

async fn start(config: RobotConfig) -> Simulator {
    Simulator::start("127.0.0.1:0", config).await.unwrap()
}

async fn connect(registry: &SessionRegistry, sim: &Simulator) -> Arc<RobotSession> {
    registry
        .connect("arm1", "127.0.0.1", &sim.port().to_string())
        .await
        .unwrap()
}

/// Polls the simulator until its servo reports `status`.
async fn wait_for_servo(sim: &Simulator, status: ServoStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while sim.servo_status().await != status {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("simulator never reached the expected servo status");
}

async fn wait_for_client_gone(sim: &Simulator) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while sim.client().await.is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("simulator still holds the client");
}

fn joint_move(pos: [f64; 7]) -> MoveCmd {
    MoveCmd::new(pos, CoordFrame::Joint, 50.0, 50.0, 50.0)
}

#[tokio::test]
async fn test_connect_move_read_disconnect() {
    let sim = start(RobotConfig::default().with_motion_duration(20)).await;
    let registry = registry();
    let session = connect(&registry, &sim).await;

    assert_eq!(sim.client().await.as_deref(), Some("arm1"));
    assert_eq!(session.state().await, SessionState::Idle);
    assert_eq!(registry.connection_status("arm1").await, Ok(StatusCode::Ok));

    session.set_servo_poweron().await.unwrap();
    assert_eq!(sim.servo_status().await, ServoStatus::Ok);

    let target = [10.0, 20.0, 30.0, 0.0, 45.0, 0.0, 0.0];
    session.robot_movej(joint_move(target)).await.unwrap();
    assert_eq!(session.state().await, SessionState::PoweredOn);
    assert_eq!(sim.position(CoordFrame::Joint).await, target);

    let sample = session.get_current_position(CoordFrame::Joint).await.unwrap();
    assert!(!sample.stale);
    assert_eq!(sample.position, target);

    session.set_speed(40).await.unwrap();
    assert_eq!(sim.speed().await, 40);
    session.sync_status().await.unwrap();
    assert_eq!(session.state().await, SessionState::PoweredOn);
    assert_eq!(session.get_speed().await, 40);

    registry.disconnect("arm1").await.unwrap();
    wait_for_client_gone(&sim).await;
    let received = sim.received().await;
    assert_eq!(received.first(), Some(&"NRC_GetStatus"));
    assert!(received.contains(&"NRC_MoveJ"));
}

#[tokio::test]
async fn test_job_stop_preempts_motion() {
    let sim = start(RobotConfig::default().with_motion_duration(5_000)).await;
    let registry = registry();
    let session = connect(&registry, &sim).await;
    session.set_servo_poweron().await.unwrap();

    let mover = {
        let session = session.clone();
        tokio::spawn(async move { session.robot_movej(joint_move([1.0; 7])).await })
    };
    wait_for_servo(&sim, ServoStatus::Running).await;
    assert_eq!(session.state().await, SessionState::Running);

    session.job_stop().await.unwrap();
    assert_eq!(mover.await.unwrap(), Err(NrcError::MotionAborted));
    assert_eq!(session.state().await, SessionState::Idle);
    assert_eq!(sim.servo_status().await, ServoStatus::Stop);
    assert_eq!(sim.position(CoordFrame::Joint).await, [0.0; 7]);
}

/// Forwards to a real driver but holds back power-on requests.
struct SlowPowerOn {
    driver: NrcDriver,
    delay: Duration,
}

#[async_trait]
impl Transport for SlowPowerOn {
    async fn send(&self, command: Command) -> Result<CommandResponse, NrcError> {
        if matches!(command, Command::NrcServoPowerOn(_)) {
            tokio::time::sleep(self.delay).await;
        }
        self.driver.send(command).await
    }

    fn is_connected(&self) -> bool {
        self.driver.is_connected()
    }

    async fn close(&self) -> Result<(), NrcError> {
        self.driver.close().await
    }
}

#[tokio::test]
async fn test_power_on_overtaken_by_job_stop_is_undone() {
    let sim = start(RobotConfig::default()).await;
    let config = NrcDriverConfig {
        addr: "127.0.0.1".to_string(),
        port: sim.port(),
        ..NrcDriverConfig::default()
    };
    let driver = NrcDriver::connect(config, "arm1").await.unwrap();
    let transport = Arc::new(SlowPowerOn {
        driver,
        delay: Duration::from_millis(200),
    });
    let session = Arc::new(
        RobotSession::open("arm1", transport, Duration::from_millis(100))
            .await
            .unwrap(),
    );

    let powering = {
        let session = session.clone();
        tokio::spawn(async move { session.set_servo_poweron().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.job_stop().await.unwrap();

    assert_eq!(powering.await.unwrap(), Err(NrcError::MotionAborted));
    assert_eq!(session.state().await, SessionState::Idle);
    assert_eq!(session.get_servo_state().await, ServoStatus::Stop);
    assert_eq!(sim.servo_status().await, ServoStatus::Stop);

    let received = sim.received().await;
    let stop = received.iter().position(|c| *c == "NRC_JobStop").unwrap();
    let on = received.iter().position(|c| *c == "NRC_ServoPowerOn").unwrap();
    let off = received.iter().rposition(|c| *c == "NRC_ServoPowerOff").unwrap();
    assert!(stop < on && on < off, "{received:?}");
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_joint_limit_faults_until_cleared() {
    let sim = start(RobotConfig::default().with_motion_duration(10)).await;
    let registry = registry();
    let session = connect(&registry, &sim).await;
    session.set_servo_poweron().await.unwrap();

    let mut pos = [0.0; 7];
    pos[0] = 200.0;
    let err = session.robot_movej(joint_move(pos)).await.unwrap_err();
    assert!(matches!(err, NrcError::Controller { id: 1003, .. }));
    assert_eq!(session.state().await, SessionState::Error);
    assert_eq!(sim.servo_status().await, ServoStatus::Error);

    session.clear_error().await.unwrap();
    assert_eq!(session.state().await, SessionState::Idle);
    session.set_servo_poweron().await.unwrap();
    session.robot_go_home().await.unwrap();
    assert_eq!(session.state().await, SessionState::PoweredOn);
}

#[tokio::test]
async fn test_jogging_round_trip() {
    let sim = start(RobotConfig::default()).await;
    let registry = registry();
    let session = connect(&registry, &sim).await;
    session.set_servo_poweron().await.unwrap();

    session.robot_start_jogging(1, JogDirection::Positive).await.unwrap();
    session.robot_start_jogging(6, JogDirection::Negative).await.unwrap();
    assert_eq!(sim.servo_status().await, ServoStatus::Running);
    assert_eq!(session.get_robot_running_state().await, 1);

    session.robot_stop_jogging(1).await.unwrap();
    session.robot_stop_jogging(6).await.unwrap();
    assert_eq!(sim.servo_status().await, ServoStatus::Ok);
    assert_eq!(session.state().await, SessionState::PoweredOn);
}

#[tokio::test]
async fn test_second_client_is_refused() {
    let sim = start(RobotConfig::default()).await;
    let first = registry();
    connect(&first, &sim).await;

    let second = registry();
    let err = second
        .connect("arm2", "127.0.0.1", &sim.port().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, NrcError::Controller { id: 1009, .. }));
    assert!(second.is_empty().await);
    assert_eq!(sim.client().await.as_deref(), Some("arm1"));
}

#[tokio::test]
async fn test_silent_controller() {
    let sim = start(RobotConfig::default().with_motion_duration(10)).await;
    let registry = registry();
    let session = connect(&registry, &sim).await;
    session.set_servo_poweron().await.unwrap();
    let target = [3.0; 7];
    session.robot_movej(joint_move(target)).await.unwrap();

    sim.set_unresponsive(true).await;

    // a slow position read falls back to the cache
    let sample = session.get_current_position(CoordFrame::Joint).await.unwrap();
    assert!(sample.stale);
    assert_eq!(sample.position, target);
    assert_eq!(session.state().await, SessionState::PoweredOn);

    // a command timeout drops the link
    let err = session.set_speed(10).await.unwrap_err();
    assert!(err.is_connection_lost());
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(registry
        .connection_status("arm1")
        .await
        .unwrap_err()
        .is_connection_lost());
}

#[tokio::test]
async fn test_program_replays_taught_points() {
    let sim = start(RobotConfig::default().with_motion_duration(5)).await;
    let registry = registry();
    let session = connect(&registry, &sim).await;
    session.set_servo_poweron().await.unwrap();

    let mut program = Program::new(StepMotion::default());
    for target in [[10.0; 7], [20.0; 7], [30.0; 7]] {
        session.robot_movej(joint_move(target)).await.unwrap();
        program.record(&session).await.unwrap();
    }
    session.robot_go_home().await.unwrap();

    let report = program.run(&session).await;
    assert!(report.is_complete(), "{report:?}");
    assert_eq!(sim.position(CoordFrame::Joint).await, [30.0; 7]);
}
