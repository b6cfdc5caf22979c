use std::io;

/// Rejected input. Raised before any transport is touched.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("address octet {0} is out of range (0-255)")]
    Octet(u32),

    #[error("port {0} is out of range (0-65535)")]
    Port(u32),

    #[error("invalid IPv4 endpoint: {0}")]
    Address(String),

    #[error("rate must be a positive number of packets per second")]
    ZeroRate,

    #[error("rate {rate} exceeds the maximum of {max} packets per second")]
    RateTooHigh { rate: u32, max: u32 },

    #[error("duration must not be negative (got {0}s)")]
    NegativeDuration(i64),

    #[error("payload of {size} bytes exceeds the maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },
}

/// The job could not be started. No packet has been sent.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("permission denied opening a {kind} socket (raw sockets need root or CAP_NET_RAW)")]
    PermissionDenied { kind: &'static str },

    #[error("could not open {kind} socket: {source}")]
    Socket {
        kind: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("could not determine source address towards {target}: {reason}")]
    SourceAddress { target: String, reason: String },
}

/// A single send failed mid-flight.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("send to {destination} failed: {source}")]
    Io {
        destination: String,
        #[source]
        source: io::Error,
    },

    #[error("short write to {destination}: {written} of {expected} bytes")]
    ShortWrite {
        destination: String,
        written: usize,
        expected: usize,
    },

    #[error("transport was used before being acquired")]
    NotAcquired,
}

/// Terminal failure of a flood job.
#[derive(Debug, thiserror::Error)]
pub enum FloodError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("aborted after {packets_sent} packets: {source}")]
    Aborted {
        packets_sent: u64,
        #[source]
        source: SendError,
    },
}

impl FloodError {
    /// Packets that left the transport before the job ended.
    pub fn packets_sent(&self) -> u64 {
        match self {
            FloodError::Aborted { packets_sent, .. } => *packets_sent,
            FloodError::Validation(_) | FloodError::Setup(_) => 0,
        }
    }
}
