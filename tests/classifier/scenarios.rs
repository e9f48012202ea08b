//! End-to-end classification scenarios

use crate::frames::*;
use std::sync::Arc;
use xdpgate::config;
use xdpgate::dataplane::RedirectTable;
use xdpgate::{ControlPlane, DecisionEngine, PolicyStore, Verdict};

const CONFIG: &str = r#"
[classifier]
interface = "eth0"

[[whitelist]]
address = "10.0.0.5"
protocols = ["tcp"]

[[whitelist]]
address = "2001:db8::5"
protocols = ["all"]

[[ports]]
port = 8080
protocols = ["tcp"]

[[ports]]
port = 53
protocols = ["udp"]
"#;

fn configured() -> ControlPlane<u32> {
    let cfg = config::parse(CONFIG).unwrap();
    assert!(!config::validate(&cfg).has_errors());

    let engine = DecisionEngine::new(Arc::new(PolicyStore::new()));
    let control = ControlPlane::new(Arc::new(engine), Arc::new(RedirectTable::new()));
    control.apply(&cfg).unwrap();
    control
}

#[test]
fn test_whitelisted_client() {
    let control = configured();
    let engine = control.engine();

    assert_eq!(engine.classify(&tcp4(CLIENT, 22), 0), Verdict::Redirect(0));
    assert_eq!(engine.classify(&udp4(CLIENT, 53), 0), Verdict::Drop);
}

#[test]
fn test_address_entry_overrides_port_rule() {
    let control = configured();
    // Port 53 allows UDP, but the client entry only allows TCP
    assert_eq!(control.engine().classify(&udp4(CLIENT, 53), 0), Verdict::Drop);
}

#[test]
fn test_unlisted_source_port_rules() {
    let control = configured();
    let engine = control.engine();

    assert_eq!(engine.classify(&tcp4(STRANGER, 8080), 0), Verdict::Redirect(0));
    assert_eq!(engine.classify(&udp4(STRANGER, 53), 0), Verdict::Redirect(0));
    assert_eq!(engine.classify(&udp4(STRANGER, 8080), 0), Verdict::Drop);
    assert_eq!(engine.classify(&tcp4(STRANGER, 9999), 0), Verdict::Pass);
    assert_eq!(engine.classify(&udp4(STRANGER, 9999), 0), Verdict::Pass);
}

#[test]
fn test_ipv6_client() {
    let control = configured();
    assert_eq!(control.engine().classify(&tcp6(CLIENT6, 1), 0), Verdict::Redirect(0));
}

#[test]
fn test_truncation_asymmetry() {
    let control = configured();
    let engine = control.engine();

    let v4 = tcp4(STRANGER, 8080);
    let v6 = tcp6(CLIENT6, 8080);

    // IPv4 header cut short
    assert_eq!(engine.classify(&v4[..14 + 12], 0), Verdict::Pass);
    // IPv6 header cut short
    assert_eq!(engine.classify(&v6[..14 + 20], 0), Verdict::Drop);
}

#[test]
fn test_arrival_queue_redirect() {
    let control = configured();
    let cfg = config::parse(&CONFIG.replace(
        "interface = \"eth0\"",
        "interface = \"eth0\"\nredirect = \"arrival\"",
    ))
    .unwrap();
    control.apply(&cfg).unwrap();

    assert_eq!(
        control.engine().classify(&tcp4(CLIENT, 22), 7),
        Verdict::Redirect(7)
    );
    assert_eq!(control.engine().classify(&arp(&[0u8; 28]), 3), Verdict::Redirect(3));
}

#[test]
fn test_fixed_queue_redirect() {
    let control = configured();
    let cfg = config::parse(&CONFIG.replace(
        "interface = \"eth0\"",
        "interface = \"eth0\"\nredirect_queue = 5",
    ))
    .unwrap();
    control.apply(&cfg).unwrap();

    assert_eq!(
        control.engine().classify(&tcp4(CLIENT, 22), 2),
        Verdict::Redirect(5)
    );
}
