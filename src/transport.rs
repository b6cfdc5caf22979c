//! Socket senders the scheduler writes packets into.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::debug;

use crate::error::{SendError, SetupError};
use crate::types::{Endpoint, Packet};

/// Capability interface over a sending socket.
///
/// `acquire` is called once before the first send and `release` once after the
/// last one, whatever the outcome.
pub trait Transport {
    fn acquire(&mut self) -> Result<(), SetupError>;

    fn send(&mut self, packet: &Packet, destination: &Endpoint) -> Result<(), SendError>;

    fn release(&mut self);
}

fn setup_error(kind: &'static str, source: io::Error) -> SetupError {
    match source.raw_os_error() {
        Some(libc::EPERM) | Some(libc::EACCES) => SetupError::PermissionDenied { kind },
        _ if source.kind() == io::ErrorKind::PermissionDenied => {
            SetupError::PermissionDenied { kind }
        }
        _ => SetupError::Socket { kind, source },
    }
}

fn send_to(socket: &Socket, packet: &Packet, address: SocketAddr) -> Result<(), SendError> {
    let written = socket
        .send_to(packet.as_bytes(), &SockAddr::from(address))
        .map_err(|source| SendError::Io {
            destination: address.to_string(),
            source,
        })?;
    if written != packet.len() {
        return Err(SendError::ShortWrite {
            destination: address.to_string(),
            written,
            expected: packet.len(),
        });
    }
    Ok(())
}

/// Raw IPv4 socket carrying TCP segments. The kernel prepends the IP header.
/// Needs root or `CAP_NET_RAW`.
#[derive(Debug, Default)]
pub struct RawTcpTransport {
    socket: Option<Socket>,
}

impl RawTcpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for RawTcpTransport {
    fn acquire(&mut self) -> Result<(), SetupError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::TCP))
            .map_err(|e| setup_error("raw TCP", e))?;
        debug!("raw TCP socket acquired");
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, packet: &Packet, destination: &Endpoint) -> Result<(), SendError> {
        let socket = self.socket.as_ref().ok_or(SendError::NotAcquired)?;
        // Raw sockets ignore the port; it already sits in the TCP header.
        send_to(socket, packet, destination.with_port(0).socket_addr())
    }

    fn release(&mut self) {
        if self.socket.take().is_some() {
            debug!("raw TCP socket released");
        }
    }
}

/// Connectionless UDP sender.
#[derive(Debug, Default)]
pub struct UdpTransport {
    socket: Option<Socket>,
}

impl UdpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local address of the acquired socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket
            .as_ref()
            .and_then(|s| s.local_addr().ok())
            .and_then(|a| a.as_socket())
    }
}

impl Transport for UdpTransport {
    fn acquire(&mut self) -> Result<(), SetupError> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| setup_error("UDP", e))?;
        let any = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        socket
            .bind(&SockAddr::from(any))
            .map_err(|e| setup_error("UDP", e))?;
        debug!("UDP socket acquired");
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, packet: &Packet, destination: &Endpoint) -> Result<(), SendError> {
        let socket = self.socket.as_ref().ok_or(SendError::NotAcquired)?;
        send_to(socket, packet, destination.socket_addr())
    }

    fn release(&mut self) {
        if self.socket.take().is_some() {
            debug!("UDP socket released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::time::Duration;

    #[test]
    fn udp_transport_delivers_payload() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut transport = UdpTransport::new();
        transport.acquire().unwrap();
        assert!(transport.local_addr().is_some());

        let destination = Endpoint::new(Ipv4Addr::LOCALHOST, port);
        transport
            .send(&Packet::from(b"XXXX".to_vec()), &destination)
            .unwrap();
        transport.release();

        let mut buf = [0u8; 16];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"XXXX");
    }

    #[test]
    fn send_before_acquire_fails() {
        let destination = Endpoint::new(Ipv4Addr::LOCALHOST, 9);
        let packet = Packet::from(vec![0u8; 4]);

        assert!(matches!(
            UdpTransport::new().send(&packet, &destination),
            Err(SendError::NotAcquired)
        ));
        assert!(matches!(
            RawTcpTransport::new().send(&packet, &destination),
            Err(SendError::NotAcquired)
        ));
    }

    #[test]
    fn permission_errors_map_to_permission_denied() {
        let err = setup_error("raw TCP", io::Error::from_raw_os_error(libc::EPERM));
        assert!(matches!(err, SetupError::PermissionDenied { kind: "raw TCP" }));

        let err = setup_error("UDP", io::Error::from_raw_os_error(libc::EMFILE));
        assert!(matches!(err, SetupError::Socket { kind: "UDP", .. }));
    }

    #[test]
    fn release_is_idempotent() {
        let mut transport = UdpTransport::new();
        transport.acquire().unwrap();
        transport.release();
        transport.release();
        assert!(transport.local_addr().is_none());
    }
}
