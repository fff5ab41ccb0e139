mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use nrc_rmi::registry::{RegistryConfig, SessionRegistry};
use nrc_rmi::{NrcError, SessionState, StatusCode};

fn registry(connector: &Arc<MockConnector>) -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::with_connector(
        RegistryConfig::default(),
        connector.clone(),
    ))
}

#[tokio::test]
async fn test_connect_then_disconnect() {
    let connector = MockConnector::new();
    let registry = registry(&connector);

    let session = registry.connect("arm1", "10.0.0.5", "7000").await.unwrap();
    assert_eq!(session.name(), "arm1");
    assert_eq!(session.state().await, SessionState::Idle);
    assert_eq!(registry.connection_status("arm1").await, Ok(StatusCode::Ok));

    let config = connector.configs.lock().unwrap()[0].clone();
    assert_eq!(config.addr, "10.0.0.5");
    assert_eq!(config.port, 7000);

    registry.disconnect("arm1").await.unwrap();
    assert_eq!(connector.last_transport().closes.load(Ordering::SeqCst), 1);
    assert!(matches!(registry.lookup("arm1").await, Err(NrcError::NotFound(_))));
    assert!(matches!(
        registry.disconnect("arm1").await,
        Err(NrcError::NotFound(_))
    ));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_second_connect_is_already_connected() {
    let connector = MockConnector::new();
    let registry = registry(&connector);
    registry.connect("arm1", "10.0.0.5", "6001").await.unwrap();

    let err = registry.connect("arm1", "10.0.0.6", "6001").await.unwrap_err();
    assert_eq!(err, NrcError::AlreadyConnected("arm1".to_string()));
    assert_eq!(connector.transports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_tombstone_is_replaced() {
    let connector = MockConnector::new();
    let registry = registry(&connector);
    let old = registry.connect("arm1", "10.0.0.5", "6001").await.unwrap();
    let old_transport = connector.last_transport();

    old_transport.drop_link();
    assert!(registry
        .connection_status("arm1")
        .await
        .unwrap_err()
        .is_connection_lost());
    assert_eq!(old.state().await, SessionState::Disconnected);
    // the tombstone stays registered until replaced or disconnected
    assert_eq!(registry.names().await, vec!["arm1".to_string()]);

    let new = registry.connect("arm1", "10.0.0.5", "6001").await.unwrap();
    assert!(!Arc::ptr_eq(&old, &new));
    assert_eq!(old_transport.closes.load(Ordering::SeqCst), 1);
    assert_eq!(registry.connection_status("arm1").await, Ok(StatusCode::Ok));
}

#[tokio::test]
async fn test_concurrent_connect_is_busy() {
    let connector = MockConnector::new();
    let registry = registry(&connector);
    connector.hold_connects();

    let first = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.connect("arm1", "10.0.0.5", "6001").await })
    };
    connector.entered.notified().await;

    assert_eq!(
        registry.connection_status("arm1").await,
        Ok(StatusCode::Connecting)
    );
    assert!(matches!(
        registry.connect("arm1", "10.0.0.5", "6001").await,
        Err(NrcError::Busy(_))
    ));
    assert!(matches!(
        registry.disconnect("arm1").await,
        Err(NrcError::Busy(_))
    ));

    connector.release();
    first.await.unwrap().unwrap();
    assert_eq!(registry.connection_status("arm1").await, Ok(StatusCode::Ok));
    assert_eq!(connector.configs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_names_are_not_blocked_by_a_slow_handshake() {
    let connector = MockConnector::new();
    let registry = registry(&connector);
    registry.connect("arm2", "10.0.0.6", "6001").await.unwrap();
    connector.hold_connects();

    let slow = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.connect("arm1", "10.0.0.5", "6001").await })
    };
    connector.entered.notified().await;

    let arm2 = registry.lookup("arm2").await.unwrap();
    arm2.set_speed(20).await.unwrap();
    assert_eq!(registry.names().await, vec!["arm2".to_string()]);

    connector.release();
    slow.await.unwrap().unwrap();
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn test_invalid_arguments() {
    let connector = MockConnector::new();
    let registry = registry(&connector);

    for (name, ip, port) in [
        ("", "10.0.0.5", "6001"),
        ("arm1", "", "6001"),
        ("arm1", "10.0.0.5", "0"),
        ("arm1", "10.0.0.5", "65536"),
        ("arm1", "10.0.0.5", "port"),
    ] {
        let err = registry.connect(name, ip, port).await.unwrap_err();
        assert!(
            matches!(err, NrcError::InvalidArgument(_)),
            "{name:?} {ip:?} {port:?} gave {err:?}"
        );
    }
    assert!(connector.configs.lock().unwrap().is_empty());
    assert!(matches!(
        registry.connection_status("nobody").await,
        Err(NrcError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_shutdown_closes_everything() {
    let connector = MockConnector::new();
    let registry = registry(&connector);
    for name in ["c", "a", "b"] {
        registry.connect(name, "10.0.0.5", "6001").await.unwrap();
    }
    assert_eq!(registry.names().await, vec!["a", "b", "c"]);

    registry.shutdown().await;
    assert!(registry.is_empty().await);
    for transport in connector.transports.lock().unwrap().iter() {
        assert_eq!(transport.closes.load(Ordering::SeqCst), 1);
    }
}
