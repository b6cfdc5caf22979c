use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use tracing::debug;

use crate::error::SetupError;
use crate::types::Endpoint;

/// Finds the local IPv4 address the routing table would use to reach
/// `destination`.
///
/// Connecting a UDP socket only selects a route, nothing is sent.
pub fn discover_source_address(destination: &Endpoint) -> Result<Ipv4Addr, SetupError> {
    let fail = |reason: String| SetupError::SourceAddress {
        target: destination.to_string(),
        reason,
    };

    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
        .map_err(|e| fail(e.to_string()))?;
    // Port 0 cannot be connected to; any port selects the same route.
    let port = if destination.port() == 0 { 9 } else { destination.port() };
    socket
        .connect((destination.address(), port))
        .map_err(|e| fail(e.to_string()))?;

    match socket.local_addr().map_err(|e| fail(e.to_string()))?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => {
            debug!(source = %ip, destination = %destination, "source address discovered");
            Ok(ip)
        }
        other => Err(fail(format!("no usable IPv4 route (got {other})"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_destination_uses_loopback_source() {
        let destination = Endpoint::new(Ipv4Addr::LOCALHOST, 80);
        let source = discover_source_address(&destination).unwrap();
        assert!(source.is_loopback());
    }

    #[test]
    fn port_zero_destination_still_resolves() {
        let destination = Endpoint::new(Ipv4Addr::LOCALHOST, 0);
        assert!(discover_source_address(&destination).is_ok());
    }
}
