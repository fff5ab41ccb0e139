/// Exact wire shapes of the line protocol spoken with the controller.
use nrc_rmi::commands::*;
use nrc_rmi::packets::*;
use nrc_rmi::{CoordFrame, ExtractInner, JogDirection, MoveCmd, RobotMode, ToolParam, WaveParam};
use serde_json::{json, Value};

fn to_value<T: serde::Serialize>(packet: &T) -> Value {
    serde_json::to_value(packet).unwrap()
}

#[test]
fn test_connect_handshake_format() {
    let packet = SendPacket::Communication(Communication::NrcConnect(NrcConnect {
        robot_name: "arm1".to_string(),
    }));
    assert_eq!(
        to_value(&packet),
        json!({"Communication": "NRC_Connect", "RobotName": "arm1"})
    );

    let line = packet.to_line().unwrap();
    assert!(line.ends_with("\r\n"));
    assert_eq!(line.matches('\n').count(), 1);

    let reply: CommunicationResponse = serde_json::from_str(
        r#"{"Communication":"NRC_Connect","ErrorID":0,"MajorVersion":1,"MinorVersion":0}"#,
    )
    .unwrap();
    assert_eq!(
        reply,
        CommunicationResponse::NrcConnect(NrcConnectResponse {
            error_id: 0,
            major_version: 1,
            minor_version: 0,
        })
    );
}

#[test]
fn test_disconnect_format() {
    let packet = SendPacket::Communication(Communication::NrcDisconnect);
    assert_eq!(to_value(&packet), json!({"Communication": "NRC_Disconnect"}));
}

#[test]
fn test_movej_format() {
    let mut cmd = Command::NrcMoveJ(NrcMotion::new(
        MoveCmd::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], CoordFrame::Joint, 50.0, 40.0, 30.0)
            .with_blend(2)
            .with_frames(1, 3),
    ));
    cmd.set_sequence_id(9);
    let value = to_value(&cmd);

    println!("\n=== NRC_MoveJ JSON Output ===");
    println!("{}", serde_json::to_string_pretty(&cmd).unwrap());

    assert_eq!(value["Command"], "NRC_MoveJ");
    assert_eq!(value["SequenceID"], 9);
    assert_eq!(value["Position"], json!([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]));
    assert_eq!(value["Coord"], 0);
    assert_eq!(value["Velocity"], 50.0);
    assert_eq!(value["Acc"], 40.0);
    assert_eq!(value["Dec"], 30.0);
    assert_eq!(value["Pl"], 2);
    assert_eq!(value["ToolNum"], 1);
    assert_eq!(value["UserNum"], 3);

    // no snake_case leaks onto the wire
    assert!(value.get("pos").is_none(), "Incorrect field name 'pos' found");
    assert!(value.get("motion").is_none(), "Incorrect field name 'motion' found");
    assert!(value.get("sequence_id").is_none());
}

#[test]
fn test_movel_weave_format() {
    let wave = WaveParam {
        wave_type: 2,
        swing_freq: 1.5,
        swing_amplitude: 4.0,
        left_stay_time: 0.1,
        initial_dir: 1,
        move_when_edge_stay: true,
        ..WaveParam::default()
    };
    let cmd = Command::NrcMoveLWeave(NrcWeaveMotion::new(
        MoveCmd::new([0.0; 7], CoordFrame::Cartesian, 10.0, 10.0, 10.0),
        wave,
    ));
    let value = to_value(&cmd);
    assert_eq!(value["Command"], "NRC_MoveLWeave");
    assert_eq!(value["Coord"], 1);
    let w = &value["Wave"];
    assert_eq!(w["Type"], 2);
    assert_eq!(w["SwingFreq"], 1.5);
    assert_eq!(w["SwingAmplitude"], 4.0);
    assert_eq!(w["LTypeAngle"], 0.0);
    assert_eq!(w["MoveWhenEdgeStay"], true);
    assert_eq!(w["LeftStayTime"], 0.1);
    assert_eq!(w["InitialDir"], 1);
    assert!(w.get("HorizontalDeflection").is_some());
    assert!(w.get("VerticalDeflection").is_some());
}

#[test]
fn test_tool_param_format() {
    let cmd = Command::NrcWriteToolParam(NrcWriteToolParam::new(
        4,
        ToolParam {
            z: 120.0,
            payload_mass: 2.5,
            payload_mass_center_z: 40.0,
            ..ToolParam::default()
        },
    ));
    let value = to_value(&cmd);
    assert_eq!(value["Command"], "NRC_WriteToolParam");
    assert_eq!(value["ToolNum"], 4);
    let p = &value["Param"];
    for field in [
        "X",
        "Y",
        "Z",
        "A",
        "B",
        "C",
        "PayloadMass",
        "PayloadInertia",
        "PayloadMassCenterX",
        "PayloadMassCenterY",
        "PayloadMassCenterZ",
    ] {
        assert!(p.get(field).is_some(), "Missing {field} field");
    }
    assert_eq!(p["Z"], 120.0);
    assert_eq!(p["PayloadMass"], 2.5);
}

#[test]
fn test_settings_and_jog_formats() {
    assert_eq!(
        to_value(&Command::NrcSetSpeed(NrcSetSpeed::new(35))),
        json!({"Command": "NRC_SetSpeed", "SequenceID": 0, "Speed": 35})
    );
    assert_eq!(
        to_value(&Command::NrcSetCoord(NrcSetCoord::new(CoordFrame::User))),
        json!({"Command": "NRC_SetCoord", "SequenceID": 0, "Coord": 3})
    );
    assert_eq!(
        to_value(&Command::NrcSetMode(NrcSetMode::new(RobotMode::Remote))),
        json!({"Command": "NRC_SetMode", "SequenceID": 0, "Mode": 1})
    );
    assert_eq!(
        to_value(&Command::NrcStartJog(NrcStartJog::new(3, JogDirection::Negative))),
        json!({"Command": "NRC_StartJog", "SequenceID": 0, "Axis": 3, "Direction": "Negative"})
    );
    assert_eq!(
        to_value(&Command::job_stop()),
        json!({"Command": "NRC_JobStop", "SequenceID": 0})
    );
}

#[test]
fn test_read_position_response_parses() {
    let line = r#"{"Command":"NRC_ReadPosition","SequenceID":4,"ErrorID":0,"Coord":1,"Position":[100.0,0.0,250.5,0.0,90.0,0.0,0.0]}"#;
    let packet: ResponsePacket = serde_json::from_str(line).unwrap();
    let response = match packet {
        ResponsePacket::CommandResponse(response) => response,
        other => panic!("expected a command response, got {other:?}"),
    };
    assert_eq!(response.name(), "NRC_ReadPosition");
    assert_eq!(response.get_sequence_id(), 4);

    let reading: NrcReadPositionResponse = response.into_inner().unwrap();
    assert_eq!(reading.coord, CoordFrame::Cartesian);
    assert_eq!(reading.position[2], 250.5);
}

#[test]
fn test_status_response_parses() {
    let line = r#"{"Command":"NRC_GetStatus","SequenceID":1,"ErrorID":0,"ServoStatus":1,"Speed":40,"Coord":0,"Mode":2,"ToolNum":1,"UserNum":0}"#;
    let response: CommandResponse = serde_json::from_str(line).unwrap();
    let status: &NrcGetStatusResponse = response.as_inner().unwrap();
    assert_eq!(status.servo_status, 1);
    assert_eq!(status.speed, 40);
    assert_eq!(status.mode, RobotMode::Run);
}

#[test]
fn test_out_of_range_coord_is_rejected_on_parse() {
    let line = r#"{"Command":"NRC_SetCoord","SequenceID":1,"Coord":7}"#;
    assert!(serde_json::from_str::<Command>(line).is_err());
}

#[test]
fn test_error_ack_parses() {
    let line = r#"{"Command":"NRC_MoveL","SequenceID":12,"ErrorID":1004}"#;
    let response: CommandResponse = serde_json::from_str(line).unwrap();
    assert_eq!(response, CommandResponse::NrcMoveL(NrcAckResponse::new(12, 1004)));
    assert_eq!(response.get_error_id(), 1004);
}

#[test]
fn test_ack_for_mirrors_command_name() {
    let mut cmd = Command::go_home();
    cmd.set_sequence_id(77);
    let ack = CommandResponse::ack_for(&cmd, 0);
    assert_eq!(ack.name(), cmd.name());
    assert_eq!(ack.get_sequence_id(), 77);
    assert_eq!(
        CommandResponse::ack_for(&Command::get_status(), 0).name(),
        "NRC_Unknown"
    );
}
