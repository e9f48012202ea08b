//! Classifier event records
//!
//! A [`LogEvent`] is built on the decision path, filtered against a
//! process-wide severity threshold and pushed onto a bounded channel as a
//! fixed 112-byte record. Enqueueing never blocks: when the channel is full
//! the new record is dropped and counted.

use crate::error::ParseError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Encoded record size
pub const RECORD_SIZE: usize = 112;
/// Message field size, NUL terminator included
pub const MESSAGE_SIZE: usize = 64;

const OFF_TS: usize = 0;
const OFF_SRC: usize = 8;
const OFF_DST: usize = 24;
const OFF_SPORT: usize = 40;
const OFF_DPORT: usize = 42;
const OFF_PROTO: usize = 44;
const OFF_IPVER: usize = 45;
const OFF_KIND: usize = 46;
const OFF_LEVEL: usize = 47;
const OFF_MSG: usize = 48;

const THRESHOLD_UNSET: u8 = u8::MAX;

/// Event severity, ordered Debug < Info < Warn < Error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LogLevel::Debug),
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Warn),
            3 => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown event level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    Pass = 1,
    Drop = 2,
    Redirect = 3,
    ProtoMismatch = 4,
    InvalidPacket = 5,
}

impl EventKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EventKind::Pass),
            2 => Some(EventKind::Drop),
            3 => Some(EventKind::Redirect),
            4 => Some(EventKind::ProtoMismatch),
            5 => Some(EventKind::InvalidPacket),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Pass => "pass",
            EventKind::Drop => "drop",
            EventKind::Redirect => "redirect",
            EventKind::ProtoMismatch => "proto_mismatch",
            EventKind::InvalidPacket => "invalid_packet",
        }
    }
}

/// One classifier event.
///
/// IPv4 addresses occupy the first 4 bytes of the 16-byte address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp_ns: u64,
    pub src_addr: [u8; 16],
    pub dst_addr: [u8; 16],
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
    /// 0 for non-IP frames
    pub ip_version: u8,
    pub kind: EventKind,
    pub level: LogLevel,
    message: [u8; MESSAGE_SIZE],
}

impl LogEvent {
    pub fn new(kind: EventKind, level: LogLevel, message: &str) -> Self {
        let mut event = Self {
            timestamp_ns: 0,
            src_addr: [0; 16],
            dst_addr: [0; 16],
            src_port: 0,
            dst_port: 0,
            protocol: 0,
            ip_version: 0,
            kind,
            level,
            message: [0; MESSAGE_SIZE],
        };
        event.set_message(message);
        event
    }

    pub fn with_ipv4(mut self, src: [u8; 4], dst: [u8; 4]) -> Self {
        self.src_addr = [0; 16];
        self.dst_addr = [0; 16];
        self.src_addr[..4].copy_from_slice(&src);
        self.dst_addr[..4].copy_from_slice(&dst);
        self.ip_version = 4;
        self
    }

    pub fn with_ipv6(mut self, src: [u8; 16], dst: [u8; 16]) -> Self {
        self.src_addr = src;
        self.dst_addr = dst;
        self.ip_version = 6;
        self
    }

    pub fn with_protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_ports(mut self, src_port: u16, dst_port: u16) -> Self {
        self.src_port = src_port;
        self.dst_port = dst_port;
        self
    }

    /// Build an event whose message is formatted in place, without allocating.
    pub fn formatted(kind: EventKind, level: LogLevel, args: fmt::Arguments<'_>) -> Self {
        let mut event = Self::new(kind, level, "");
        event.write_message(args);
        event
    }

    fn set_message(&mut self, message: &str) {
        self.write_message(format_args!("{}", message));
    }

    /// Store at most 63 bytes of the message, cut on a char boundary.
    fn write_message(&mut self, args: fmt::Arguments<'_>) {
        self.message = [0; MESSAGE_SIZE];
        let mut writer = MessageWriter {
            buf: &mut self.message,
            len: 0,
        };
        let _ = fmt::Write::write_fmt(&mut writer, args);
    }

    pub fn message(&self) -> &str {
        let len = self
            .message
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MESSAGE_SIZE);
        std::str::from_utf8(&self.message[..len]).unwrap_or("")
    }

    pub fn src_ip(&self) -> Option<IpAddr> {
        Self::ip(self.ip_version, &self.src_addr)
    }

    pub fn dst_ip(&self) -> Option<IpAddr> {
        Self::ip(self.ip_version, &self.dst_addr)
    }

    fn ip(version: u8, addr: &[u8; 16]) -> Option<IpAddr> {
        match version {
            4 => Some(IpAddr::V4(Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]))),
            6 => Some(IpAddr::V6(Ipv6Addr::from(*addr))),
            _ => None,
        }
    }

    /// Encode into the fixed wire layout. Multi-byte integers are big-endian.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[OFF_TS..OFF_SRC].copy_from_slice(&self.timestamp_ns.to_be_bytes());
        buf[OFF_SRC..OFF_DST].copy_from_slice(&self.src_addr);
        buf[OFF_DST..OFF_SPORT].copy_from_slice(&self.dst_addr);
        buf[OFF_SPORT..OFF_DPORT].copy_from_slice(&self.src_port.to_be_bytes());
        buf[OFF_DPORT..OFF_PROTO].copy_from_slice(&self.dst_port.to_be_bytes());
        buf[OFF_PROTO] = self.protocol;
        buf[OFF_IPVER] = self.ip_version;
        buf[OFF_KIND] = self.kind as u8;
        buf[OFF_LEVEL] = self.level as u8;
        buf[OFF_MSG..].copy_from_slice(&self.message);
        buf
    }

    /// Decode a record produced by [`LogEvent::encode`].
    pub fn decode(buf: &[u8]) -> Result<Self, ParseError> {
        if buf.len() < RECORD_SIZE {
            return Err(ParseError::Truncated {
                header: "log record",
                needed: RECORD_SIZE,
                remaining: buf.len(),
            });
        }

        let kind = EventKind::from_u8(buf[OFF_KIND]).ok_or(ParseError::Malformed {
            header: "log record",
            reason: "unknown event kind",
        })?;
        let level = LogLevel::from_u8(buf[OFF_LEVEL]).ok_or(ParseError::Malformed {
            header: "log record",
            reason: "unknown level",
        })?;

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&buf[OFF_TS..OFF_SRC]);
        let mut src_addr = [0u8; 16];
        src_addr.copy_from_slice(&buf[OFF_SRC..OFF_DST]);
        let mut dst_addr = [0u8; 16];
        dst_addr.copy_from_slice(&buf[OFF_DST..OFF_SPORT]);
        let mut message = [0u8; MESSAGE_SIZE];
        message.copy_from_slice(&buf[OFF_MSG..RECORD_SIZE]);
        // Always terminated, whatever the producer wrote
        message[MESSAGE_SIZE - 1] = 0;

        Ok(Self {
            timestamp_ns: u64::from_be_bytes(ts),
            src_addr,
            dst_addr,
            src_port: u16::from_be_bytes([buf[OFF_SPORT], buf[OFF_SPORT + 1]]),
            dst_port: u16::from_be_bytes([buf[OFF_DPORT], buf[OFF_DPORT + 1]]),
            protocol: buf[OFF_PROTO],
            ip_version: buf[OFF_IPVER],
            kind,
            level,
            message,
        })
    }
}

/// Truncating writer over the message field. The last byte stays NUL.
struct MessageWriter<'a> {
    buf: &'a mut [u8; MESSAGE_SIZE],
    len: usize,
}

impl fmt::Write for MessageWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = MESSAGE_SIZE - 1 - self.len;
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

/// Producer side of the event channel. Shared by every classification.
pub struct EventEmitter {
    tx: Sender<[u8; RECORD_SIZE]>,
    threshold: AtomicU8,
    lost: Arc<AtomicU64>,
    started: Instant,
}

/// Consumer side of the event channel.
pub struct EventReceiver {
    rx: Receiver<[u8; RECORD_SIZE]>,
    lost: Arc<AtomicU64>,
}

/// Create a bounded event channel holding at most `capacity` records.
pub fn channel(capacity: usize) -> (EventEmitter, EventReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    let lost = Arc::new(AtomicU64::new(0));
    (
        EventEmitter {
            tx,
            threshold: AtomicU8::new(THRESHOLD_UNSET),
            lost: Arc::clone(&lost),
            started: Instant::now(),
        },
        EventReceiver { rx, lost },
    )
}

impl EventEmitter {
    pub fn set_threshold(&self, level: LogLevel) {
        self.threshold.store(level as u8, Ordering::Relaxed);
    }

    /// Unset threshold: every event is emitted.
    pub fn clear_threshold(&self) {
        self.threshold.store(THRESHOLD_UNSET, Ordering::Relaxed);
    }

    pub fn threshold(&self) -> Option<LogLevel> {
        LogLevel::from_u8(self.threshold.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        let threshold = self.threshold.load(Ordering::Relaxed);
        threshold == THRESHOLD_UNSET || level as u8 >= threshold
    }

    /// Stamp and enqueue an event. Returns whether it was queued.
    pub fn emit(&self, mut event: LogEvent) -> bool {
        if !self.enabled(event.level) {
            return false;
        }
        event.timestamp_ns = self.started.elapsed().as_nanos() as u64;

        match self.tx.try_send(event.encode()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.lost.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Events lost to saturation and not yet reported
    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }
}

impl EventReceiver {
    pub fn try_recv(&self) -> Option<[u8; RECORD_SIZE]> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for one record. `Err` once every emitter is gone.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<[u8; RECORD_SIZE]>, RecvTimeoutError> {
        match self.rx.recv_timeout(timeout) {
            Ok(record) => Ok(Some(record)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read and reset the lost-event counter.
    pub fn take_lost(&self) -> u64 {
        self.lost.swap(0, Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
