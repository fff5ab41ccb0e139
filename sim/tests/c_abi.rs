//! The exported C functions against a live simulator.

use std::ffi::CString;

use nrc_rmi::ffi;
use nrc_rmi::StatusCode;
use sim::{RobotConfig, Simulator};

#[test]
fn test_c_abi_session() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let sim = runtime
        .block_on(Simulator::start(
            "127.0.0.1:0",
            RobotConfig::default().with_motion_duration(10),
        ))
        .unwrap();

    let ip = CString::new("127.0.0.1").unwrap();
    let port = CString::new(sim.port().to_string()).unwrap();
    let name = CString::new("ffi_arm").unwrap();
    let name = name.as_ptr();

    unsafe {
        assert_eq!(ffi::nrc_init(), 0);
        assert_eq!(ffi::nrc_init(), 0);
        assert_eq!(ffi::connect_robot(ip.as_ptr(), port.as_ptr(), name), 0);
        assert_eq!(
            ffi::connect_robot(ip.as_ptr(), port.as_ptr(), name),
            StatusCode::AlreadyConnected.code()
        );
        assert_eq!(ffi::get_connection_status(name), 0);

        assert_eq!(ffi::get_servo_state(name), 0);
        assert_eq!(ffi::set_servo_state(3, name), StatusCode::InvalidArgument.code());
        assert_eq!(ffi::set_servo_poweron(name), 0);
        assert_eq!(ffi::get_servo_state(name), 1);

        let mut target = [5.0, 10.0, 15.0, 0.0, 30.0, 0.0, 0.0];
        assert_eq!(ffi::robot_movej(target.as_mut_ptr(), 50, 0, 50, 50, name), 0);
        let mut pos = [0.0f64; 7];
        assert_eq!(ffi::get_current_position(pos.as_mut_ptr(), 0, name), 0);
        assert_eq!(pos, target);

        assert_eq!(ffi::set_speed(30, name), 0);
        assert_eq!(ffi::get_speed(name), 30);
        assert_eq!(ffi::set_speed(0, name), StatusCode::InvalidArgument.code());
        assert_eq!(ffi::set_current_coord(1, name), 0);
        assert_eq!(ffi::get_current_coord(name), 1);
        assert_eq!(ffi::set_current_coord(4, name), StatusCode::InvalidArgument.code());
        assert_eq!(ffi::set_current_mode(2, name), 0);
        assert_eq!(ffi::get_current_mode(name), 2);

        assert_eq!(ffi::robot_start_jogging(2, true, name), 0);
        assert_eq!(
            ffi::robot_start_jogging(2, false, name),
            StatusCode::AlreadyJogging.code()
        );
        assert_eq!(ffi::get_robot_running_state(name), 1);
        assert_eq!(ffi::robot_stop_jogging(2, name), 0);
        assert_eq!(ffi::get_robot_running_state(name), 0);

        assert_eq!(ffi::robot_go_home(name), 0);
        assert_eq!(ffi::job_stop(name), 0);
        assert_eq!(ffi::get_servo_state(name), 0);
        assert_eq!(ffi::robot_go_to_reset_position(name), StatusCode::InvalidTransition.code());

        assert_eq!(ffi::disconnect_robot(name), 0);
        assert_eq!(ffi::get_connection_status(name), StatusCode::NotFound.code());
        assert_eq!(ffi::nrc_shutdown(), 0);
        assert_eq!(ffi::nrc_shutdown(), StatusCode::NotInitialized.code());
        assert_eq!(ffi::get_speed(name), StatusCode::NotInitialized.code());
    }
    drop(sim);
}
