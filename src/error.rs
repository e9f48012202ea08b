use std::io;

/// Header parsing failures. Never leave a single classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{header} header truncated: need {needed} bytes, {remaining} remaining")]
    Truncated {
        header: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("unsupported IPv6 extension header {next_header}")]
    UnsupportedExtension { next_header: u8 },

    #[error("malformed {header} header: {reason}")]
    Malformed {
        header: &'static str,
        reason: &'static str,
    },
}

/// Which fixed-capacity policy table an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Ipv4Addresses,
    Ipv6Addresses,
    Ports,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::Ipv4Addresses => write!(f, "ipv4 whitelist"),
            TableKind::Ipv6Addresses => write!(f, "ipv6 whitelist"),
            TableKind::Ports => write!(f, "port rules"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("{table} is full ({capacity} entries)")]
    CapacityExceeded { table: TableKind, capacity: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RedirectError {
    #[error("no consumer registered for queue {queue}")]
    MissingTarget { queue: u32 },

    #[error("queue {queue} out of range (max {max})")]
    QueueOutOfRange { queue: u32, max: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("interface {name} not found")]
    InterfaceNotFound { name: String },

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("redirect error: {0}")]
    Redirect(#[from] RedirectError),
}

pub type Result<T> = std::result::Result<T, Error>;
