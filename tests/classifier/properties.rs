//! Property tests for verdicts that hold for any payload

use crate::frames::*;
use proptest::prelude::*;
use std::sync::Arc;
use xdpgate::{DecisionEngine, PolicyKey, PolicyStore, ProtocolMask, RedirectMode, Verdict};

fn engine() -> DecisionEngine {
    let engine = DecisionEngine::new(Arc::new(PolicyStore::new()));
    engine
        .policy()
        .upsert(PolicyKey::from(CLIENT), ProtocolMask::UDP)
        .unwrap();
    engine
        .policy()
        .upsert(PolicyKey::Port(80), ProtocolMask::TCP)
        .unwrap();
    engine
}

proptest! {
    #[test]
    fn test_short_frames_pass(frame in proptest::collection::vec(any::<u8>(), 0..14)) {
        prop_assert_eq!(engine().classify(&frame, 0), Verdict::Pass);
    }

    #[test]
    fn test_arp_always_redirected(
        payload in proptest::collection::vec(any::<u8>(), 0..128),
        queue in 0u32..64,
    ) {
        let engine = engine();
        prop_assert_eq!(engine.classify(&arp(&payload), queue), Verdict::Redirect(0));

        engine.set_redirect_mode(RedirectMode::ArrivalQueue);
        prop_assert_eq!(engine.classify(&arp(&payload), queue), Verdict::Redirect(queue));
    }

    #[test]
    fn test_unlisted_tcp_follows_port_rule(port in any::<u16>()) {
        let expected = if port == 80 { Verdict::Redirect(0) } else { Verdict::Pass };
        prop_assert_eq!(engine().classify(&tcp4(STRANGER, port), 0), expected);
    }

    #[test]
    fn test_classify_never_panics(frame in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = engine().classify(&frame, 0);
    }
}
