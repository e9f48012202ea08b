//! Classifier log events and the observer

use crate::frames::*;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use xdpgate::protocol::ip_proto;
use xdpgate::telemetry::{channel, EventKind, EventObserver, EventReceiver, LogEvent, LogLevel};
use xdpgate::{DecisionEngine, PolicyKey, PolicyStore, ProtocolMask, Verdict};

fn engine(capacity: usize) -> (DecisionEngine, EventReceiver) {
    let (emitter, rx) = channel(capacity);
    let engine = DecisionEngine::new(Arc::new(PolicyStore::new())).with_events(Arc::new(emitter));
    engine
        .policy()
        .upsert(PolicyKey::from(CLIENT), ProtocolMask::TCP)
        .unwrap();
    (engine, rx)
}

fn drain(rx: &EventReceiver) -> Vec<LogEvent> {
    std::iter::from_fn(|| rx.try_recv())
        .map(|record| LogEvent::decode(&record).unwrap())
        .collect()
}

fn truncated_ipv6() -> Vec<u8> {
    let mut frame = tcp6(CLIENT6, 80);
    frame.truncate(14 + 24);
    frame
}

#[test]
fn test_warn_threshold_suppresses_debug_redirect() {
    let (engine, rx) = engine(16);
    engine.events().unwrap().set_threshold(LogLevel::Warn);

    assert_eq!(engine.classify(&tcp4(CLIENT, 22), 0), Verdict::Redirect(0));
    assert!(drain(&rx).is_empty());
}

#[test]
fn test_malformed_ipv6_reported_at_every_threshold() {
    let levels = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    for level in levels {
        let (engine, rx) = engine(16);
        engine.events().unwrap().set_threshold(level);

        assert_eq!(engine.classify(&truncated_ipv6(), 0), Verdict::Drop);
        let events = drain(&rx);
        assert_eq!(events.len(), 1, "threshold {}", level.as_str());
        assert_eq!(events[0].kind, EventKind::InvalidPacket);
        assert_eq!(events[0].level, LogLevel::Error);
    }
}

#[test]
fn test_event_carries_flow() {
    let (engine, rx) = engine(16);
    engine.classify(&udp4(CLIENT, 53), 0);

    let events = drain(&rx);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind, EventKind::ProtoMismatch);
    assert_eq!(event.ip_version, 4);
    assert_eq!(event.protocol, ip_proto::UDP);
    assert_eq!(event.src_ip(), Some(IpAddr::V4(CLIENT)));
    assert_eq!(event.dst_ip(), Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
    assert!(!event.message().is_empty());
    assert!(event.message().len() < 64);
}

#[test]
fn test_saturated_channel_counts_lost_events() {
    let (engine, rx) = engine(2);
    for _ in 0..5 {
        assert_eq!(engine.classify(&tcp4(CLIENT, 22), 0), Verdict::Redirect(0));
    }

    assert_eq!(rx.len(), 2);
    assert_eq!(engine.events().unwrap().lost(), 3);
    assert_eq!(rx.take_lost(), 3);
    assert_eq!(rx.take_lost(), 0);
}

#[test]
fn test_observer_drains_and_reports_lost() {
    let (engine, rx) = engine(2);
    for _ in 0..4 {
        engine.classify(&tcp4(CLIENT, 22), 0);
    }

    let observer = EventObserver::new(rx);
    let stats = observer.drain();
    assert_eq!(stats.rendered, 2);
    assert_eq!(stats.malformed, 0);
    assert_eq!(stats.lost, 2);
}
