//! C ABI matching `include/nrc_rmi.h`.
//!
//! Every function selects its robot by name and blocks the calling thread until
//! the controller answers or a timeout elapses. The registry and the tokio
//! runtime that drives it live in one process-wide context created by
//! [`nrc_init`] (or lazily by [`connect_robot`]) and torn down by
//! [`nrc_shutdown`].
//!
//! Return values follow [`StatusCode`]: `0` success, positive non-fatal,
//! negative errors. Getters return their value when it is non-negative.

use std::ffi::{c_char, c_int, CStr};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::{Builder, Runtime};
use tracing::{error, info};

use crate::errors::to_status;
use crate::registry::{RegistryConfig, SessionRegistry};
use crate::session::RobotSession;
use crate::{CoordFrame, JogDirection, MoveCmd, NrcError, StatusCode, AXIS_COUNT};

struct FfiContext {
    runtime: Runtime,
    registry: SessionRegistry,
}

static CONTEXT: Mutex<Option<Arc<FfiContext>>> = Mutex::new(None);

fn context(create: bool) -> Result<Arc<FfiContext>, NrcError> {
    let mut slot = CONTEXT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(ctx) = slot.as_ref() {
        return Ok(ctx.clone());
    }
    if !create {
        return Err(NrcError::NotInitialized);
    }
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .thread_name("nrc-rmi")
        .build()
        .map_err(|e| {
            error!("failed to start runtime: {}", e);
            NrcError::NotInitialized
        })?;
    let ctx = Arc::new(FfiContext {
        runtime,
        registry: SessionRegistry::new(RegistryConfig::default()),
    });
    *slot = Some(ctx.clone());
    info!("nrc_rmi initialised");
    Ok(ctx)
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the call.
unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, NrcError> {
    if ptr.is_null() {
        return Err(NrcError::InvalidArgument(format!("{what} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| NrcError::InvalidArgument(format!("{what} is not valid UTF-8")))
}

fn code<T>(result: Result<T, NrcError>, value: impl FnOnce(T) -> c_int) -> c_int {
    match result {
        Ok(v) => value(v),
        Err(e) => e.status_code().code(),
    }
}

/// Runs `op` against the named session on the shared runtime.
///
/// # Safety
/// See [`read_str`].
unsafe fn with_session<T, F, Fut>(robot_name: *const c_char, op: F) -> Result<T, NrcError>
where
    F: FnOnce(Arc<RobotSession>) -> Fut,
    Fut: Future<Output = Result<T, NrcError>>,
{
    let name = read_str(robot_name, "robotName")?;
    let ctx = context(false)?;
    ctx.runtime.block_on(async {
        let session = ctx.registry.lookup(name).await?;
        op(session).await
    })
}

/// # Safety
/// `pos` must be null or point to `AXIS_COUNT` doubles.
unsafe fn read_pose(pos: *const f64) -> Result<[f64; AXIS_COUNT], NrcError> {
    if pos.is_null() {
        return Err(NrcError::InvalidArgument("pos is null".to_string()));
    }
    let mut pose = [0.0; AXIS_COUNT];
    pose.copy_from_slice(std::slice::from_raw_parts(pos, AXIS_COUNT));
    Ok(pose)
}

/// Creates the process-wide registry. Calling it again is a no-op.
#[no_mangle]
pub extern "C" fn nrc_init() -> c_int {
    code(context(true), |_| StatusCode::Ok.code())
}

/// Disconnects every robot and stops the runtime.
#[no_mangle]
pub extern "C" fn nrc_shutdown() -> c_int {
    let ctx = CONTEXT
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    match ctx {
        Some(ctx) => {
            ctx.runtime.block_on(ctx.registry.shutdown());
            info!("nrc_rmi shut down");
            StatusCode::Ok.code()
        }
        None => StatusCode::NotInitialized.code(),
    }
}

/// # Safety
/// All pointers must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn connect_robot(
    ip: *const c_char,
    port: *const c_char,
    robot_name: *const c_char,
) -> c_int {
    let result = (|| {
        let ip = read_str(ip, "ip")?;
        let port = read_str(port, "port")?;
        let name = read_str(robot_name, "robotName")?;
        let ctx = context(true)?;
        ctx.runtime
            .block_on(ctx.registry.connect(name, ip, port))
            .map(|_| ())
    })();
    to_status(result)
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn disconnect_robot(robot_name: *const c_char) -> c_int {
    let result = (|| {
        let name = read_str(robot_name, "robotName")?;
        let ctx = context(false)?;
        ctx.runtime.block_on(ctx.registry.disconnect(name))
    })();
    to_status(result)
}

/// `0` connected, `2` mid-handshake, negative otherwise.
///
/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn get_connection_status(robot_name: *const c_char) -> c_int {
    let result = (|| {
        let name = read_str(robot_name, "robotName")?;
        let ctx = context(false)?;
        ctx.runtime.block_on(ctx.registry.connection_status(name))
    })();
    code(result, StatusCode::code)
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn clear_error(robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.clear_error().await }),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn set_servo_state(state: c_int, robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.set_servo_state(state).await }),
    )
}

/// Servo status `0..=3`, or a negative status code.
///
/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn get_servo_state(robot_name: *const c_char) -> c_int {
    code(
        with_session(robot_name, |s| async move { Ok(s.get_servo_state().await) }),
        |status| u8::from(status) as c_int,
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn set_servo_poweron(robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.set_servo_poweron().await }),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn set_servo_poweroff(robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.set_servo_poweroff().await }),
    )
}

/// Fills `pos[7]`. Returns `1` when the pose came from the cache.
///
/// # Safety
/// `pos` must be null or point to 7 writable doubles; `robot_name` must be null
/// or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn get_current_position(
    pos: *mut f64,
    coord: c_int,
    robot_name: *const c_char,
) -> c_int {
    if pos.is_null() {
        return StatusCode::InvalidArgument.code();
    }
    let result = with_session(robot_name, |s| async move {
        let coord = CoordFrame::try_from(coord)?;
        s.get_current_position(coord).await
    });
    code(result, |sample| {
        std::slice::from_raw_parts_mut(pos, AXIS_COUNT).copy_from_slice(&sample.position);
        if sample.stale {
            StatusCode::Stale.code()
        } else {
            StatusCode::Ok.code()
        }
    })
}

/// `1` while a motion or jog is in progress, otherwise `0`.
///
/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn get_robot_running_state(robot_name: *const c_char) -> c_int {
    code(
        with_session(robot_name, |s| async move { Ok(s.get_robot_running_state().await) }),
        |running| running,
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn set_speed(speed: c_int, robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.set_speed(speed).await }),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn get_speed(robot_name: *const c_char) -> c_int {
    code(
        with_session(robot_name, |s| async move { Ok(s.get_speed().await) }),
        c_int::from,
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn set_current_coord(coord: c_int, robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.set_current_coord(coord).await }),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn get_current_coord(robot_name: *const c_char) -> c_int {
    code(
        with_session(robot_name, |s| async move { Ok(s.get_current_coord().await) }),
        |coord| c_int::from(u8::from(coord)),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn set_current_mode(mode: c_int, robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.set_current_mode(mode).await }),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn get_current_mode(robot_name: *const c_char) -> c_int {
    code(
        with_session(robot_name, |s| async move { Ok(s.get_current_mode().await) }),
        |mode| c_int::from(u8::from(mode)),
    )
}

/// `dir`: `true` jogs in the positive direction.
///
/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn robot_start_jogging(
    axis: c_int,
    dir: bool,
    robot_name: *const c_char,
) -> c_int {
    to_status(
        with_session(robot_name, |s| async move {
            s.robot_start_jogging(axis, JogDirection::from(dir)).await
        }),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn robot_stop_jogging(axis: c_int, robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.robot_stop_jogging(axis).await }),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn robot_go_to_reset_position(robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.robot_go_to_reset_position().await }),
    )
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn robot_go_home(robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.robot_go_home().await }),
    )
}

/// # Safety
/// `pos` must be null or point to 7 doubles; `robot_name` must be null or a
/// valid NUL-terminated string.
unsafe fn move_cmd(
    pos: *const f64,
    vel: c_int,
    coord: c_int,
    acc: c_int,
    dec: c_int,
) -> Result<MoveCmd, NrcError> {
    let pose = read_pose(pos)?;
    let coord = CoordFrame::try_from(coord)?;
    Ok(MoveCmd::new(pose, coord, vel as f64, acc as f64, dec as f64))
}

/// # Safety
/// `pos` must be null or point to 7 doubles; `robot_name` must be null or a
/// valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn robot_movej(
    pos: *mut f64,
    vel: c_int,
    coord: c_int,
    acc: c_int,
    dec: c_int,
    robot_name: *const c_char,
) -> c_int {
    let result = move_cmd(pos, vel, coord, acc, dec).and_then(|cmd| {
        with_session(robot_name, |s| async move { s.robot_movej(cmd).await })
    });
    to_status(result)
}

/// # Safety
/// `pos` must be null or point to 7 doubles; `robot_name` must be null or a
/// valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn robot_movel(
    pos: *mut f64,
    vel: c_int,
    coord: c_int,
    acc: c_int,
    dec: c_int,
    robot_name: *const c_char,
) -> c_int {
    let result = move_cmd(pos, vel, coord, acc, dec).and_then(|cmd| {
        with_session(robot_name, |s| async move { s.robot_movel(cmd).await })
    });
    to_status(result)
}

/// # Safety
/// `robot_name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn job_stop(robot_name: *const c_char) -> c_int {
    to_status(
        with_session(robot_name, |s| async move { s.job_stop().await }),
    )
}
