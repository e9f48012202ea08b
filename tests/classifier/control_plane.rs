//! Control-plane updates observed by the packet path

use crate::frames::*;
use std::net::Ipv4Addr;
use std::sync::Arc;
use xdpgate::dataplane::{Dispatcher, Disposition, RedirectTable};
use xdpgate::error::{PolicyError, RedirectError, TableKind};
use xdpgate::policy::MAX_PORT_RULES;
use xdpgate::telemetry::MetricsRegistry;
use xdpgate::{ControlPlane, DecisionEngine, PolicyKey, PolicyStore, ProtocolMask, Verdict};

fn control() -> ControlPlane<u32> {
    let engine = DecisionEngine::new(Arc::new(PolicyStore::new()));
    ControlPlane::new(Arc::new(engine), Arc::new(RedirectTable::new()))
}

#[test]
fn test_upsert_then_delete_restores_behavior() {
    let cp = control();
    let frame = udp4(STRANGER, 53);
    let before = cp.engine().classify(&frame, 0);

    cp.upsert(PolicyKey::from(STRANGER), ProtocolMask::TCP).unwrap();
    assert_eq!(cp.engine().classify(&frame, 0), Verdict::Drop);

    assert!(cp.delete(PolicyKey::from(STRANGER)));
    assert_eq!(cp.engine().classify(&frame, 0), before);
}

#[test]
fn test_repeated_upsert_is_idempotent() {
    let cp = control();
    for _ in 0..3 {
        cp.upsert(PolicyKey::Port(8080), ProtocolMask::TCP).unwrap();
    }
    assert_eq!(cp.engine().policy().len(TableKind::Ports), 1);
    assert_eq!(cp.engine().classify(&tcp4(STRANGER, 8080), 0), Verdict::Redirect(0));
}

#[test]
fn test_port_table_capacity() {
    let cp = control();
    for port in 0..MAX_PORT_RULES as u16 {
        cp.upsert(PolicyKey::Port(port + 1), ProtocolMask::UDP).unwrap();
    }

    let err = cp.upsert(PolicyKey::Port(60000), ProtocolMask::UDP).unwrap_err();
    assert!(matches!(
        err,
        PolicyError::CapacityExceeded {
            table: TableKind::Ports,
            ..
        }
    ));
    // Overwriting an existing key still succeeds at capacity
    cp.upsert(PolicyKey::Port(1), ProtocolMask::ALL).unwrap();
    assert_eq!(cp.engine().policy().len(TableKind::Ports), MAX_PORT_RULES);
}

#[test]
fn test_updates_visible_from_other_threads() {
    let cp = Arc::new(control());
    let writer = {
        let cp = Arc::clone(&cp);
        std::thread::spawn(move || {
            for i in 0..200u32 {
                let addr = Ipv4Addr::from(0x0a01_0000 + i);
                cp.upsert(PolicyKey::from(addr), ProtocolMask::UDP).unwrap();
            }
        })
    };

    // Reads never see a torn table: unlisted TCP to no port rule always passes
    for _ in 0..200 {
        assert_eq!(cp.engine().classify(&tcp4(STRANGER, 9999), 0), Verdict::Pass);
    }
    writer.join().unwrap();

    assert_eq!(
        cp.engine().classify(&tcp4(Ipv4Addr::new(10, 1, 0, 7), 22), 0),
        Verdict::Drop
    );
}

#[test]
fn test_redirect_target_lifecycle() {
    let redirects = Arc::new(RedirectTable::new());
    let metrics = Arc::new(MetricsRegistry::new());
    let engine = DecisionEngine::new(Arc::new(PolicyStore::new())).with_metrics(Arc::clone(&metrics));
    let cp = ControlPlane::new(Arc::new(engine), Arc::clone(&redirects));
    let dispatcher = Dispatcher::new(Arc::clone(&redirects), Arc::clone(&metrics));

    let verdict = cp.engine().classify(&arp(&[0u8; 28]), 0);
    assert_eq!(verdict, Verdict::Redirect(0));
    assert_eq!(dispatcher.dispatch(verdict), Disposition::Deliver);
    assert_eq!(metrics.redirect_fallbacks.get(), 1);

    cp.set_redirect_target(0, 42).unwrap();
    assert_eq!(
        dispatcher.dispatch(verdict),
        Disposition::Push {
            queue: 0,
            target: 42
        }
    );

    assert_eq!(
        cp.set_redirect_target(64, 1),
        Err(RedirectError::QueueOutOfRange { queue: 64, max: 63 })
    );
}
