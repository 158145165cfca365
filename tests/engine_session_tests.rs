use serde_json::{json, Value};
use std::time::Duration;
use telemtab::codec::encode_into;
use telemtab::config::ClientConfig;
use telemtab::engine::{session, Notification, SessionEnd, SessionHandle};
use telemtab::error::SessionError;
use telemtab::transport::{memory_pair, MemoryConnector, MemoryPeer};
use tokio::time::{sleep, timeout};

fn test_config() -> ClientConfig {
    ClientConfig {
        name: "test-session".to_string(),
        render_period_ms: 5,
        ..ClientConfig::default()
    }
}

async fn next_message(peer: &mut MemoryPeer) -> Value {
    let messages = timeout(Duration::from_secs(2), peer.recv_messages())
        .await
        .expect("timed out waiting for client")
        .expect("client closed")
        .expect("undecodable unit");
    assert_eq!(messages.len(), 1);
    Value::Object(messages.into_iter().next().unwrap())
}

async fn next_notification(
    handle: &SessionHandle,
    wanted: impl Fn(&Notification) -> bool,
) -> Notification {
    timeout(Duration::from_secs(2), async {
        loop {
            match handle.notifications().try_recv() {
                Ok(notification) if wanted(&notification) => return notification,
                Ok(_) => continue,
                Err(_) => sleep(Duration::from_millis(5)).await,
            }
        }
    })
    .await
    .expect("timed out waiting for notification")
}

#[tokio::test]
async fn test_session_connects_and_echoes() {
    let (connector, mut peer) = memory_pair("memory://echo");
    let (session, mut handle) = session(test_config(), Box::new(connector)).unwrap();
    let task = tokio::spawn(session.run());

    handle.wait_connected().await.unwrap();
    assert!(handle.state().is_connected());

    peer.send_json(&json!({"__id__": "abc", "loopback": 1})).unwrap();
    assert_eq!(
        next_message(&mut peer).await,
        json!({"__id__": "abc", "loopback": 1})
    );

    peer.close();
    let end = task.await.unwrap().unwrap();
    assert_eq!(end, SessionEnd::PeerClosed);
    assert!(handle.state().is_closed());
}

#[tokio::test]
async fn test_points_reach_render_snapshot() {
    let (connector, peer) = memory_pair("memory://plot");
    let (session, mut handle) = session(test_config(), Box::new(connector)).unwrap();
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    // Plot setup and data in one unit, so ordering is fixed
    let mut unit = Vec::new();
    encode_into(
        &json!({"plot": {"name": "power", "channel": "volts", "state": true, "width": 8, "shown": true}}),
        &mut unit,
    )
    .unwrap();
    encode_into(
        &json!({"ui": {"power": {"points": {"volts": [[0, 100], [10, 200]]}}}}),
        &mut unit,
    )
    .unwrap();
    peer.send_unit(unit).unwrap();

    let mut snapshots = handle.snapshots();
    let frame = {
        let snapshot = timeout(
            Duration::from_secs(2),
            snapshots.wait_for(|s| s.shown_frame().map_or(false, |f| !f.lines.is_empty())),
        )
        .await
        .expect("timed out waiting for snapshot")
        .unwrap();
        snapshot.shown_frame().unwrap()
    };

    assert_eq!(frame.tab, "power");
    assert_eq!(frame.width, 8);
    assert_eq!(frame.lines.len(), 1);
    let line = &frame.lines[0];
    assert_eq!(line.channel, "volts");
    assert_eq!(line.points.len(), 8);
    let close = |a: [f64; 2], b: [f64; 2]| (a[0] - b[0]).abs() < 1e-9 && (a[1] - b[1]).abs() < 1e-9;
    assert!(close(line.points[0], [-1.0, -1.0]));
    assert!(close(line.points[7], [1.0, 1.0]));

    handle.shutdown().unwrap();
    assert_eq!(task.await.unwrap().unwrap(), SessionEnd::Shutdown);
}

#[tokio::test]
async fn test_ui_commands_and_outbound_messages() {
    let (connector, mut peer) = memory_pair("memory://commands");
    let (session, mut handle) = session(test_config(), Box::new(connector)).unwrap();
    let monitor = session.monitor();
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    handle.set_capacity("power", 32).unwrap();
    let changed = next_notification(&handle, |n| {
        matches!(n, Notification::CapacityChanged { .. })
    })
    .await;
    assert_eq!(
        changed,
        Notification::CapacityChanged {
            tab: "power".into(),
            capacity: 32
        }
    );

    handle.set_capacity("power", 0).unwrap();
    next_notification(&handle, |n| matches!(n, Notification::Rejected { .. })).await;

    handle.send_frame(16.5).unwrap();
    assert_eq!(next_message(&mut peer).await, json!({"ui": {"time": 16.5}}));

    handle.send_event("power", json!({"key": "a"})).unwrap();
    assert_eq!(
        next_message(&mut peer).await,
        json!({"ui": {"name": "power", "event": {"key": "a"}}})
    );

    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();

    let report = monitor.generate_report();
    assert!(report.contains("test-session"));
    assert!(report.contains("Out: 2 frames"));
}

#[tokio::test]
async fn test_tab_logs_are_forwarded() {
    let (connector, peer) = memory_pair("memory://logs");
    let (session, mut handle) = session(test_config(), Box::new(connector)).unwrap();
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    peer.send_json(&json!({"ui": {"power": {"log_message": "armed"}}}))
        .unwrap();

    let log = next_notification(&handle, |n| matches!(n, Notification::TabLog(_))).await;
    match log {
        Notification::TabLog(log) => {
            assert_eq!(log.tab, "power");
            assert_eq!(log.lines, vec!["armed".to_string()]);
        }
        other => panic!("unexpected {:?}", other),
    }

    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_undrained_notifications_stay_bounded() {
    let config = ClientConfig {
        notification_queue: 4,
        ..test_config()
    };
    let (connector, mut peer) = memory_pair("memory://flood");
    let (session, mut handle) = session(config, Box::new(connector)).unwrap();
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    for i in 0..20 {
        peer.send_json(&json!({"ui": {"power": {"log_message": format!("line {}", i)}}}))
            .unwrap();
    }
    // Echo comes back only after every log line was handled
    peer.send_json(&json!({"__id__": "sync"})).unwrap();
    assert_eq!(next_message(&mut peer).await, json!({"__id__": "sync"}));

    peer.close();
    task.await.unwrap().unwrap();

    let queued: Vec<Notification> = handle.notifications().try_iter().collect();
    assert_eq!(queued.len(), 4);
    assert!(matches!(queued[3], Notification::Closed { .. }));
    match &queued[2] {
        Notification::TabLog(log) => assert_eq!(log.lines, vec!["line 19".to_string()]),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_close_is_surfaced() {
    let (connector, mut peer) = memory_pair("memory://close");
    let (session, mut handle) = session(test_config(), Box::new(connector)).unwrap();
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    peer.close();
    task.await.unwrap().unwrap();

    let closed = next_notification(&handle, |n| matches!(n, Notification::Closed { .. })).await;
    assert_eq!(
        closed,
        Notification::Closed {
            reason: "closed by peer".into()
        }
    );
    assert!(matches!(
        handle.wait_connected().await,
        Err(SessionError::Closed(_))
    ));
}

#[tokio::test]
async fn test_refused_connection_is_terminal() {
    let connector = MemoryConnector::refusing("memory://nowhere");
    let (session, mut handle) = session(test_config(), Box::new(connector)).unwrap();

    let result = session.run().await;

    assert!(matches!(result, Err(SessionError::Transport(_))));
    assert!(handle.state().is_closed());
    assert!(handle.wait_connected().await.is_err());
    assert!(handle.send_frame(1.0).is_err());
}

#[tokio::test]
async fn test_framing_error_ends_session() {
    let (connector, peer) = memory_pair("memory://framing");
    let config = ClientConfig {
        max_frame_len: 64,
        ..test_config()
    };
    let (session, mut handle) = session(config, Box::new(connector)).unwrap();
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    let mut unit = 1000u32.to_be_bytes().to_vec();
    unit.extend_from_slice(b"{}");
    peer.send_unit(unit).unwrap();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(SessionError::Framing(_))));
    assert!(handle.state().is_closed());
}

#[tokio::test]
async fn test_incomplete_frame_at_close_is_reported() {
    let (connector, mut peer) = memory_pair("memory://partial");
    let (session, mut handle) = session(test_config(), Box::new(connector)).unwrap();
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    let mut unit = 50u32.to_be_bytes().to_vec();
    unit.extend_from_slice(b"{\"a\"");
    peer.send_unit(unit).unwrap();
    peer.close();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(SessionError::Framing(_))));
}

#[tokio::test]
async fn test_registered_handler_and_tab_removal() {
    let (connector, mut peer) = memory_pair("memory://handlers");
    let (mut session, mut handle) = session(test_config(), Box::new(connector)).unwrap();
    session.register_handler(
        "ping",
        Box::new(|value: Value, response: &mut serde_json::Map<String, Value>| {
            response.insert("pong".into(), value);
        }),
    );
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    peer.send_json(&json!({"ping": 7, "plot": {"name": "power", "shown": true}}))
        .unwrap();
    assert_eq!(next_message(&mut peer).await, json!({"pong": 7}));

    let mut snapshots = handle.snapshots();
    timeout(
        Duration::from_secs(2),
        snapshots.wait_for(|s| s.shown.as_deref() == Some("power")),
    )
    .await
    .expect("timed out waiting for tab")
    .unwrap();

    handle.remove_tab("power").unwrap();
    timeout(
        Duration::from_secs(2),
        snapshots.wait_for(|s| s.shown.is_none() && !s.tabs.contains_key("power")),
    )
    .await
    .expect("timed out waiting for removal")
    .unwrap();

    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_handle_plot_controls() {
    let (connector, peer) = memory_pair("memory://controls");
    let (session, mut handle) = session(test_config(), Box::new(connector)).unwrap();
    let task = tokio::spawn(session.run());
    handle.wait_connected().await.unwrap();

    handle.set_channel_state("power", "volts", true).unwrap();
    handle.set_color("power", "volts", "#00ff00").unwrap();
    handle.resize("power", 4, 3).unwrap();
    handle.show("power", true).unwrap();

    // Commands are applied in order; wait for them before sending data
    let mut snapshots = handle.snapshots();
    timeout(
        Duration::from_secs(2),
        snapshots.wait_for(|s| s.shown_frame().map_or(false, |f| f.width == 4)),
    )
    .await
    .expect("timed out waiting for resize")
    .unwrap();

    peer.send_json(&json!({"ui": {"power": {"points": {"volts": [[1, 1], [2, 2]]}}}}))
        .unwrap();
    let frame = {
        let snapshot = timeout(
            Duration::from_secs(2),
            snapshots.wait_for(|s| s.shown_frame().map_or(false, |f| !f.lines.is_empty())),
        )
        .await
        .expect("timed out waiting for line")
        .unwrap();
        snapshot.shown_frame().unwrap()
    };
    assert_eq!((frame.width, frame.height), (4, 3));
    assert_eq!(frame.lines[0].color.to_hex(), "#00ff00");
    assert_eq!(frame.lines[0].points.len(), 4);

    handle.clear("power").unwrap();
    timeout(
        Duration::from_secs(2),
        snapshots.wait_for(|s| s.shown_frame().map_or(false, |f| f.lines.is_empty())),
    )
    .await
    .expect("timed out waiting for clear")
    .unwrap();

    handle.scale_capacity("power", true).unwrap();
    let changed = next_notification(&handle, |n| {
        matches!(n, Notification::CapacityChanged { .. })
    })
    .await;
    assert_eq!(
        changed,
        Notification::CapacityChanged {
            tab: "power".into(),
            capacity: 538
        }
    );

    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();
}
