use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{MAX_RATE, MAX_UDP_PAYLOAD};
use crate::error::ValidationError;

/// An IPv4 address and port. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    address: Ipv4Addr,
    port: u16,
}

impl Endpoint {
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self { address, port }
    }

    /// Builds an endpoint from unchecked numeric parts, e.g. values parsed from
    /// user input into wider integers.
    pub fn from_parts(octets: [u32; 4], port: u32) -> Result<Self, ValidationError> {
        let mut checked = [0u8; 4];
        for (slot, octet) in checked.iter_mut().zip(octets) {
            *slot = u8::try_from(octet).map_err(|_| ValidationError::Octet(octet))?;
        }
        let port = u16::try_from(port).map_err(|_| ValidationError::Port(port))?;
        Ok(Self::new(Ipv4Addr::from(checked), port))
    }

    /// Parses a dotted-quad address and a decimal port given separately.
    pub fn parse(address: &str, port: &str) -> Result<Self, ValidationError> {
        let bad_address = || ValidationError::Address(address.to_string());

        let parts: Vec<&str> = address.split('.').collect();
        if parts.len() != 4 {
            return Err(bad_address());
        }
        let mut octets = [0u32; 4];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            *slot = part.parse::<u32>().map_err(|_| bad_address())?;
        }
        let port = port
            .parse::<u32>()
            .map_err(|_| ValidationError::Address(format!("{address}:{port}")))?;

        Self::from_parts(octets, port)
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.address, port)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.address, self.port))
    }
}

impl FromStr for Endpoint {
    type Err = ValidationError;

    /// Accepts `a.b.c.d:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ValidationError::Address(s.to_string()))?;
        Self::parse(address, port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(*addr.ip(), addr.port())
    }
}

/// Wire-ready bytes. Never mutated after creation; clones share the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet(Arc<[u8]>);

impl Packet {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Packet {
    fn from(bytes: Vec<u8>) -> Self {
        Packet(bytes.into())
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A validated request to send `rate` packets per second to `target` for
/// `duration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloodJob {
    target: Endpoint,
    duration: Duration,
    rate: u32,
    payload_size: Option<usize>,
}

impl FloodJob {
    pub fn new(target: Endpoint, duration: Duration, rate: u32) -> Result<Self, ValidationError> {
        if rate == 0 {
            return Err(ValidationError::ZeroRate);
        }
        if rate > MAX_RATE {
            return Err(ValidationError::RateTooHigh {
                rate,
                max: MAX_RATE,
            });
        }
        Ok(Self {
            target,
            duration,
            rate,
            payload_size: None,
        })
    }

    /// Same as [`FloodJob::new`] but takes the duration as signed seconds, as
    /// typed on the command line.
    pub fn from_secs(target: Endpoint, duration_secs: i64, rate: u32) -> Result<Self, ValidationError> {
        let secs = u64::try_from(duration_secs)
            .map_err(|_| ValidationError::NegativeDuration(duration_secs))?;
        Self::new(target, Duration::from_secs(secs), rate)
    }

    pub fn with_payload_size(mut self, size: usize) -> Result<Self, ValidationError> {
        if size > MAX_UDP_PAYLOAD {
            return Err(ValidationError::PayloadTooLarge {
                size,
                max: MAX_UDP_PAYLOAD,
            });
        }
        self.payload_size = Some(size);
        Ok(self)
    }

    pub fn target(&self) -> Endpoint {
        self.target
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn payload_size(&self) -> Option<usize> {
        self.payload_size
    }

    /// Upper bound on the number of sends this job may perform. A trailing
    /// partial second still gets a full window.
    pub fn send_budget(&self) -> u64 {
        let windows = self.duration.as_secs() + u64::from(self.duration.subsec_nanos() > 0);
        u64::from(self.rate) * windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_octet_256() {
        assert_eq!(
            Endpoint::from_parts([10, 0, 0, 256], 80),
            Err(ValidationError::Octet(256))
        );
        assert_eq!(
            Endpoint::parse("10.0.256.1", "80"),
            Err(ValidationError::Octet(256))
        );
    }

    #[test]
    fn rejects_port_70000() {
        assert_eq!(
            Endpoint::from_parts([10, 0, 0, 1], 70_000),
            Err(ValidationError::Port(70_000))
        );
        assert_eq!(
            "10.0.0.1:70000".parse::<Endpoint>(),
            Err(ValidationError::Port(70_000))
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(matches!(
            Endpoint::parse("10.0.1", "80"),
            Err(ValidationError::Address(_))
        ));
        assert!(matches!(
            Endpoint::parse("10.0.0.x", "80"),
            Err(ValidationError::Address(_))
        ));
        assert!(matches!(
            "10.0.0.1".parse::<Endpoint>(),
            Err(ValidationError::Address(_))
        ));
    }

    #[test]
    fn parses_and_displays_endpoint() {
        let endpoint: Endpoint = "192.168.1.20:8080".parse().unwrap();
        assert_eq!(endpoint.address(), Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(endpoint.port(), 8080);
        assert_eq!(endpoint.to_string(), "192.168.1.20:8080");
    }

    #[test]
    fn job_rejects_zero_rate_and_negative_duration() {
        let target = Endpoint::new(Ipv4Addr::LOCALHOST, 80);
        assert_eq!(
            FloodJob::new(target, Duration::from_secs(1), 0),
            Err(ValidationError::ZeroRate)
        );
        assert_eq!(
            FloodJob::from_secs(target, -1, 10),
            Err(ValidationError::NegativeDuration(-1))
        );
        assert!(matches!(
            FloodJob::new(target, Duration::from_secs(1), MAX_RATE + 1),
            Err(ValidationError::RateTooHigh { .. })
        ));
    }

    #[test]
    fn job_rejects_oversized_payload() {
        let target = Endpoint::new(Ipv4Addr::LOCALHOST, 53);
        let job = FloodJob::from_secs(target, 1, 1).unwrap();
        assert!(matches!(
            job.clone().with_payload_size(MAX_UDP_PAYLOAD + 1),
            Err(ValidationError::PayloadTooLarge { .. })
        ));
        assert_eq!(job.with_payload_size(512).unwrap().payload_size(), Some(512));
    }

    #[test]
    fn send_budget_counts_whole_windows() {
        let target = Endpoint::new(Ipv4Addr::LOCALHOST, 80);
        assert_eq!(FloodJob::from_secs(target, 10, 100).unwrap().send_budget(), 1000);
        assert_eq!(FloodJob::from_secs(target, 0, 100).unwrap().send_budget(), 0);
        let partial = FloodJob::new(target, Duration::from_millis(1500), 10).unwrap();
        assert_eq!(partial.send_budget(), 20);
    }

    #[test]
    fn packet_clones_share_bytes() {
        let packet = Packet::from(vec![1, 2, 3]);
        let clone = packet.clone();
        assert_eq!(clone.as_bytes(), &[1, 2, 3]);
        assert_eq!(packet.len(), 3);
        assert!(!packet.is_empty());
    }
}
