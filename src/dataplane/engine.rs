//! Per-frame decision engine
//!
//! Classification order:
//! 1. Ethernet (one optional 802.1Q tag). Truncated => Pass.
//! 2. ARP => Redirect.
//! 3. IPv4 / IPv6: source address whitelist first. An address entry decides
//!    the frame on its own (Redirect if the protocol bit is set, else Drop).
//! 4. Otherwise TCP/UDP destination port rules; anything else => Pass.
//!
//! IPv4 parse failures pass the frame, IPv6 parse failures drop it.
//! The decision path does not allocate, block or loop unboundedly.

use crate::policy::{AddressKey, PolicyKey, PolicyStore, ProtocolMask};
use crate::protocol::{
    ip_proto, parse_ethernet, parse_ipv4, parse_ipv6, parse_tcp, parse_udp, protocol_name,
    EtherType, HeaderCursor,
};
use crate::telemetry::{EventEmitter, EventKind, LogEvent, LogLevel, MetricsRegistry};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Terminal decision for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Continue into the normal network stack unmodified
    Pass,
    /// Discard
    Drop,
    /// Hand to the consumer ring of the given queue
    Redirect(u32),
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Drop => write!(f, "DROP"),
            Verdict::Redirect(queue) => write!(f, "REDIRECT(queue {})", queue),
        }
    }
}

/// Which queue a Redirect verdict names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// Always the same queue (single consumer)
    Fixed(u32),
    /// The queue the frame arrived on (one consumer per queue)
    ArrivalQueue,
}

impl Default for RedirectMode {
    fn default() -> Self {
        RedirectMode::Fixed(0)
    }
}

const ARRIVAL_QUEUE: u32 = u32::MAX;

impl RedirectMode {
    fn encode(self) -> u32 {
        match self {
            RedirectMode::Fixed(queue) => queue,
            RedirectMode::ArrivalQueue => ARRIVAL_QUEUE,
        }
    }

    fn decode(raw: u32) -> Self {
        match raw {
            ARRIVAL_QUEUE => RedirectMode::ArrivalQueue,
            queue => RedirectMode::Fixed(queue),
        }
    }
}

/// Addressing facts gathered while parsing, carried into events.
#[derive(Debug, Clone, Copy, Default)]
struct Flow {
    ip_version: u8,
    src: [u8; 16],
    dst: [u8; 16],
    protocol: u8,
    src_port: u16,
    dst_port: u16,
}

impl Flow {
    fn v4(src: [u8; 4], dst: [u8; 4], protocol: u8) -> Self {
        let mut flow = Flow {
            ip_version: 4,
            protocol,
            ..Default::default()
        };
        flow.src[..4].copy_from_slice(&src);
        flow.dst[..4].copy_from_slice(&dst);
        flow
    }

    fn v6(src: [u8; 16], dst: [u8; 16], protocol: u8) -> Self {
        Flow {
            ip_version: 6,
            src,
            dst,
            protocol,
            ..Default::default()
        }
    }
}

pub struct DecisionEngine {
    policy: Arc<PolicyStore>,
    events: Option<Arc<EventEmitter>>,
    metrics: Arc<MetricsRegistry>,
    redirect_mode: AtomicU32,
}

impl DecisionEngine {
    pub fn new(policy: Arc<PolicyStore>) -> Self {
        Self {
            policy,
            events: None,
            metrics: Arc::new(MetricsRegistry::new()),
            redirect_mode: AtomicU32::new(RedirectMode::default().encode()),
        }
    }

    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_redirect_mode(self, mode: RedirectMode) -> Self {
        self.set_redirect_mode(mode);
        self
    }

    pub fn policy(&self) -> &Arc<PolicyStore> {
        &self.policy
    }

    pub fn events(&self) -> Option<&Arc<EventEmitter>> {
        self.events.as_ref()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn redirect_mode(&self) -> RedirectMode {
        RedirectMode::decode(self.redirect_mode.load(Ordering::Relaxed))
    }

    pub fn set_redirect_mode(&self, mode: RedirectMode) {
        self.redirect_mode.store(mode.encode(), Ordering::Relaxed);
    }

    /// Classify one frame received on `rx_queue`.
    pub fn classify(&self, frame: &[u8], rx_queue: u32) -> Verdict {
        let verdict = self.decide(frame, rx_queue);
        self.metrics.record_verdict(verdict);
        verdict
    }

    fn decide(&self, frame: &[u8], rx_queue: u32) -> Verdict {
        let mut cursor = HeaderCursor::new(frame);

        let eth = match parse_ethernet(&mut cursor) {
            Ok(eth) => eth,
            Err(e) => {
                self.invalid(LogLevel::Warn, &Flow::default(), &e);
                return Verdict::Pass;
            }
        };

        match EtherType::from_u16(eth.ethertype()) {
            Some(EtherType::Arp) => {
                let queue = self.target_queue(rx_queue);
                self.emit(
                    EventKind::Redirect,
                    LogLevel::Debug,
                    &Flow::default(),
                    format_args!("arp redirected to queue {}", queue),
                );
                Verdict::Redirect(queue)
            }
            Some(EtherType::Ipv4) => self.decide_ipv4(&mut cursor, rx_queue),
            Some(EtherType::Ipv6) => self.decide_ipv6(&mut cursor, rx_queue),
            _ => {
                self.emit(
                    EventKind::Pass,
                    LogLevel::Debug,
                    &Flow::default(),
                    format_args!("non-ip ethertype 0x{:04x} passed", eth.ethertype()),
                );
                Verdict::Pass
            }
        }
    }

    fn decide_ipv4(&self, cursor: &mut HeaderCursor<'_>, rx_queue: u32) -> Verdict {
        let ip = match parse_ipv4(cursor) {
            Ok(ip) => ip,
            Err(e) => {
                self.invalid(LogLevel::Warn, &Flow::default(), &e);
                return Verdict::Pass;
            }
        };

        let mut flow = Flow::v4(ip.src_octets(), ip.dst_octets(), ip.protocol());
        let key = PolicyKey::Address(AddressKey::V4(ip.src_octets()));
        self.decide_ip(cursor, &mut flow, key, ip.is_later_fragment(), rx_queue)
    }

    fn decide_ipv6(&self, cursor: &mut HeaderCursor<'_>, rx_queue: u32) -> Verdict {
        let packet = match parse_ipv6(cursor) {
            Ok(packet) => packet,
            Err(e) => {
                self.invalid(LogLevel::Error, &Flow::default(), &e);
                return Verdict::Drop;
            }
        };

        let src = packet.header.src_octets();
        let mut flow = Flow::v6(src, packet.header.dst_octets(), packet.protocol);
        let key = PolicyKey::Address(AddressKey::V6(src));
        self.decide_ip(cursor, &mut flow, key, packet.later_fragment, rx_queue)
    }

    /// Address stage, then port stage.
    fn decide_ip(
        &self,
        cursor: &mut HeaderCursor<'_>,
        flow: &mut Flow,
        address: PolicyKey,
        later_fragment: bool,
        rx_queue: u32,
    ) -> Verdict {
        let protocol = flow.protocol;
        let name = protocol_name(protocol);

        if let Some(entry) = self.policy.lookup(address) {
            return self.apply_entry(entry, flow, rx_queue, format_args!("source {}", name));
        }

        if protocol != ip_proto::TCP && protocol != ip_proto::UDP {
            self.emit(
                EventKind::Pass,
                LogLevel::Debug,
                flow,
                format_args!("no address policy, {} passed", name),
            );
            return Verdict::Pass;
        }

        if later_fragment {
            self.emit(
                EventKind::Pass,
                LogLevel::Debug,
                flow,
                format_args!("non-first {} fragment passed", name),
            );
            return Verdict::Pass;
        }

        let ports = if protocol == ip_proto::TCP {
            parse_tcp(cursor).map(|tcp| (tcp.src_port(), tcp.dst_port()))
        } else {
            parse_udp(cursor).map(|udp| (udp.src_port(), udp.dst_port()))
        };
        let (src_port, dst_port) = match ports {
            Ok(ports) => ports,
            Err(e) => {
                self.invalid(LogLevel::Warn, flow, &e);
                return Verdict::Pass;
            }
        };
        flow.src_port = src_port;
        flow.dst_port = dst_port;

        match self.policy.lookup(PolicyKey::Port(dst_port)) {
            Some(rule) => self.apply_entry(
                rule,
                flow,
                rx_queue,
                format_args!("port {} {}", dst_port, name),
            ),
            None => {
                self.emit(
                    EventKind::Pass,
                    LogLevel::Debug,
                    flow,
                    format_args!("no policy matched"),
                );
                Verdict::Pass
            }
        }
    }

    /// A matched entry redirects when it permits the protocol, else drops.
    fn apply_entry(
        &self,
        entry: ProtocolMask,
        flow: &Flow,
        rx_queue: u32,
        what: fmt::Arguments<'_>,
    ) -> Verdict {
        if entry.permits(flow.protocol) {
            let queue = self.target_queue(rx_queue);
            self.emit(
                EventKind::Redirect,
                LogLevel::Debug,
                flow,
                format_args!("{} whitelisted, redirect to queue {}", what, queue),
            );
            Verdict::Redirect(queue)
        } else {
            self.emit(
                EventKind::ProtoMismatch,
                LogLevel::Info,
                flow,
                format_args!("{} not permitted by {}", what, entry),
            );
            Verdict::Drop
        }
    }

    fn target_queue(&self, rx_queue: u32) -> u32 {
        match self.redirect_mode() {
            RedirectMode::Fixed(queue) => queue,
            RedirectMode::ArrivalQueue => rx_queue,
        }
    }

    fn invalid(&self, level: LogLevel, flow: &Flow, error: &crate::error::ParseError) {
        self.metrics.invalid.inc();
        self.emit(
            EventKind::InvalidPacket,
            level,
            flow,
            format_args!("{}", error),
        );
    }

    fn emit(&self, kind: EventKind, level: LogLevel, flow: &Flow, message: fmt::Arguments<'_>) {
        let Some(events) = &self.events else {
            return;
        };
        if !events.enabled(level) {
            return;
        }

        let mut event = LogEvent::formatted(kind, level, message)
            .with_protocol(flow.protocol)
            .with_ports(flow.src_port, flow.dst_port);
        match flow.ip_version {
            4 => {
                event = event.with_ipv4(
                    [flow.src[0], flow.src[1], flow.src[2], flow.src[3]],
                    [flow.dst[0], flow.dst[1], flow.dst[2], flow.dst[3]],
                )
            }
            6 => event = event.with_ipv6(flow.src, flow.dst),
            _ => {}
        }
        events.emit(event);
    }
}
