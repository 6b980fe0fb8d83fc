mod common;

use common::{init_tracing, wait_for_event, wait_until, AfterScript, ScriptedChannel};
use pretty_assertions::assert_eq;
use templog_core::datalog::{Record, RecordStore};
use templog_core::protocol::{
    IngestEvent, IngestorConfig, IngestorState, ProtocolError, SerialIngestor,
};

fn ingestor() -> (
    SerialIngestor,
    tokio::sync::mpsc::UnboundedReceiver<IngestEvent>,
) {
    let config = IngestorConfig {
        record_events: true,
        ..IngestorConfig::default()
    };
    SerialIngestor::new(RecordStore::new(), config)
}

#[test]
fn test_lines_appended_in_order_and_eof_faults() {
    init_tracing();
    let (mut ingestor, mut rx) = ingestor();
    let channel = ScriptedChannel::new(
        &[
            b"5,OK\r\n",
            b"2024-01-01 10:00:00,21.5,18.0,OK\r\n2024-01-01 10:01",
            b":00,21.7,18.0,OK\r\ngarbage,only,two\n",
            b"2024-01-01 10:02:00,22.0,18.0,ALARM,extra\n",
        ],
        AfterScript::Eof,
    );

    ingestor.connect_channel("mock", Box::new(channel)).unwrap();
    let events = wait_for_event(&mut rx, |e| matches!(e, IngestEvent::ConnectionLost { .. }));

    assert_eq!(
        events[0],
        IngestEvent::Connected {
            port: "mock".into()
        }
    );
    let expected = vec![
        Record::new("2024-01-01 10:00:00", "21.5", "18.0", "OK"),
        Record::new("2024-01-01 10:01:00", "21.7", "18.0", "OK"),
        Record::new("2024-01-01 10:02:00", "22.0", "18.0", "ALARM"),
    ];
    assert_eq!(ingestor.store().snapshot(), expected);

    let received: Vec<Record> = events
        .iter()
        .filter_map(|e| match e {
            IngestEvent::Record(r) => Some(r.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(received, expected);

    assert!(matches!(
        ingestor.state(),
        IngestorState::Faulted { ref port, .. } if port == "mock"
    ));
    assert_eq!(ingestor.port(), Some("mock"));
}

#[test]
fn test_record_events_off_by_default() {
    init_tracing();
    let (mut ingestor, mut rx) = SerialIngestor::new(RecordStore::new(), IngestorConfig::default());
    let channel = ScriptedChannel::new(
        &[b"2024-01-01 10:00:00,21.5,18.0,OK\n2024-01-01 10:01:00,21.7,18.0,OK\n"],
        AfterScript::Eof,
    );

    ingestor.connect_channel("mock", Box::new(channel)).unwrap();
    let events = wait_for_event(&mut rx, |e| matches!(e, IngestEvent::ConnectionLost { .. }));

    assert_eq!(ingestor.store().len(), 2);
    assert_eq!(events.len(), 2);
    assert!(!events.iter().any(|e| matches!(e, IngestEvent::Record(_))));
}

#[test]
fn test_io_error_faults_with_reason() {
    init_tracing();
    let (mut ingestor, mut rx) = ingestor();
    let channel = ScriptedChannel::new(&[b"a,b,c,d\n"], AfterScript::Unplugged);

    ingestor.connect_channel("usb0", Box::new(channel)).unwrap();
    let events = wait_for_event(&mut rx, |e| matches!(e, IngestEvent::ConnectionLost { .. }));

    match events.last() {
        Some(IngestEvent::ConnectionLost { port, reason }) => {
            assert_eq!(port, "usb0");
            assert!(reason.contains("unplugged"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(ingestor.store().len(), 1);
    assert!(!ingestor.is_connected());
}

#[test]
fn test_download_and_disconnect() {
    init_tracing();
    let (mut ingestor, mut rx) = ingestor();
    let channel = ScriptedChannel::new(&[], AfterScript::Idle);
    let written = channel.written();

    ingestor.connect_channel("logger", Box::new(channel)).unwrap();
    assert!(ingestor.is_connected());

    ingestor.request_download().unwrap();
    assert_eq!(written.lock().unwrap().as_slice(), b"GET_DATA\n");

    ingestor.disconnect();
    assert_eq!(ingestor.state(), IngestorState::Disconnected);
    assert_eq!(ingestor.port(), None);

    let events = wait_for_event(&mut rx, |e| matches!(e, IngestEvent::Disconnected { .. }));
    assert!(!events
        .iter()
        .any(|e| matches!(e, IngestEvent::ConnectionLost { .. })));
}

#[test]
fn test_second_connect_rejected_while_connected() {
    init_tracing();
    let (mut ingestor, _rx) = ingestor();
    ingestor
        .connect_channel("one", Box::new(ScriptedChannel::new(&[], AfterScript::Idle)))
        .unwrap();

    let err = ingestor
        .connect_channel("two", Box::new(ScriptedChannel::new(&[], AfterScript::Idle)))
        .unwrap_err();
    assert!(matches!(err, ProtocolError::AlreadyConnected(ref p) if p == "one"));
}

#[test]
fn test_reconnect_after_fault() {
    init_tracing();
    let (mut ingestor, mut rx) = ingestor();
    ingestor
        .connect_channel("first", Box::new(ScriptedChannel::new(&[b"1,2,3,4\n"], AfterScript::Eof)))
        .unwrap();
    wait_for_event(&mut rx, |e| matches!(e, IngestEvent::ConnectionLost { .. }));

    ingestor
        .connect_channel("second", Box::new(ScriptedChannel::new(&[b"5,6,7,8\n"], AfterScript::Idle)))
        .unwrap();
    wait_until(|| ingestor.store().len() == 2);

    assert_eq!(
        ingestor.state(),
        IngestorState::Connected {
            port: "second".into()
        }
    );
    assert_eq!(ingestor.store().snapshot()[1].status(), "8");
}

#[test]
fn test_connect_missing_port_stays_disconnected() {
    init_tracing();
    let (mut ingestor, _rx) = ingestor();
    let err = ingestor.connect("/dev/templog-missing").unwrap_err();

    assert!(matches!(err, ProtocolError::PortUnavailable { ref port, .. } if port == "/dev/templog-missing"));
    assert_eq!(ingestor.state(), IngestorState::Disconnected);
}

#[test]
fn test_download_requires_connection() {
    init_tracing();
    let (mut ingestor, _rx) = ingestor();
    assert!(matches!(
        ingestor.request_download(),
        Err(ProtocolError::NotConnected)
    ));
}

#[test]
fn test_disconnect_when_idle_is_harmless() {
    init_tracing();
    let (mut ingestor, _rx) = ingestor();
    ingestor.disconnect();
    ingestor.disconnect();
    assert_eq!(ingestor.state(), IngestorState::Disconnected);
}
