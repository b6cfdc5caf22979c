//! Packet producers driven by the scheduler, one call per packet.

use std::net::Ipv4Addr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{DEFAULT_PAYLOAD_SIZE, SEQUENCE_RANGE, SYN_SOURCE_PORTS};
use crate::error::SetupError;
use crate::net::ip::discover_source_address;
use crate::net::tcp::{build_syn_segment, SegmentParams};
use crate::types::{Endpoint, Packet};

pub trait PacketFactory {
    /// Called once before the first window. Failing here aborts setup.
    fn prepare(&mut self, _target: &Endpoint) -> Result<(), SetupError> {
        Ok(())
    }

    /// Produces the next packet for `target`.
    fn next_packet(&mut self, target: &Endpoint) -> Packet;
}

/// SYN segments with a fresh sequence number and source port per packet.
pub struct SynSegmentFactory<R = StdRng> {
    rng: R,
    source: Option<Ipv4Addr>,
}

impl SynSegmentFactory<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for SynSegmentFactory<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SynSegmentFactory<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, source: None }
    }

    /// Uses `source` instead of asking the routing table in `prepare`.
    pub fn with_source(mut self, source: Ipv4Addr) -> Self {
        self.source = Some(source);
        self
    }

    pub fn source(&self) -> Option<Ipv4Addr> {
        self.source
    }

    /// Draws the per-packet parameters.
    pub fn next_params(&mut self, source: Ipv4Addr, target: &Endpoint) -> SegmentParams {
        let source_port = self.rng.gen_range(SYN_SOURCE_PORTS);
        let sequence_number = self.rng.gen_range(SEQUENCE_RANGE);
        SegmentParams::new(Endpoint::new(source, source_port), *target, sequence_number)
    }
}

impl<R: Rng> PacketFactory for SynSegmentFactory<R> {
    fn prepare(&mut self, target: &Endpoint) -> Result<(), SetupError> {
        if self.source.is_none() {
            self.source = Some(discover_source_address(target)?);
        }
        Ok(())
    }

    fn next_packet(&mut self, target: &Endpoint) -> Packet {
        let source = self.source.unwrap_or(Ipv4Addr::UNSPECIFIED);
        let params = self.next_params(source, target);
        build_syn_segment(&params)
    }
}

/// The same fixed-size payload for every datagram.
#[derive(Debug, Clone)]
pub struct PayloadFactory {
    payload: Packet,
}

impl PayloadFactory {
    pub fn new(size: usize) -> Self {
        Self {
            payload: Packet::from(vec![b'X'; size]),
        }
    }

    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }
}

impl Default for PayloadFactory {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_SIZE)
    }
}

impl PacketFactory for PayloadFactory {
    fn next_packet(&mut self, _target: &Endpoint) -> Packet {
        self.payload.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::tcp::{verify_segment_checksum, TcpHeader};

    fn target() -> Endpoint {
        Endpoint::new(Ipv4Addr::new(192, 0, 2, 7), 443)
    }

    #[test]
    fn syn_factory_draws_within_ranges() {
        let source = Ipv4Addr::new(192, 0, 2, 1);
        let mut factory = SynSegmentFactory::with_rng(StdRng::seed_from_u64(7)).with_source(source);
        factory.prepare(&target()).unwrap();

        for _ in 0..500 {
            let packet = factory.next_packet(&target());
            let header = TcpHeader::parse(packet.as_bytes()).unwrap();
            assert!(SEQUENCE_RANGE.contains(&header.sequence_number));
            assert!(SYN_SOURCE_PORTS.contains(&header.source_port));
            assert_eq!(header.destination_port, 443);
            assert!(verify_segment_checksum(
                packet.as_bytes(),
                source,
                target().address()
            ));
        }
    }

    #[test]
    fn seeded_factories_are_reproducible() {
        let source = Ipv4Addr::new(192, 0, 2, 1);
        let mut a = SynSegmentFactory::with_rng(StdRng::seed_from_u64(42)).with_source(source);
        let mut b = SynSegmentFactory::with_rng(StdRng::seed_from_u64(42)).with_source(source);
        for _ in 0..10 {
            assert_eq!(a.next_packet(&target()), b.next_packet(&target()));
        }
    }

    #[test]
    fn prepare_keeps_an_explicit_source() {
        let source = Ipv4Addr::new(198, 51, 100, 9);
        let mut factory = SynSegmentFactory::new().with_source(source);
        factory.prepare(&target()).unwrap();
        assert_eq!(factory.source(), Some(source));
    }

    #[test]
    fn prepare_discovers_loopback_source() {
        let mut factory = SynSegmentFactory::new();
        factory
            .prepare(&Endpoint::new(Ipv4Addr::LOCALHOST, 80))
            .unwrap();
        assert!(factory.source().unwrap().is_loopback());
    }

    #[test]
    fn payload_factory_repeats_fixed_payload() {
        let mut factory = PayloadFactory::default();
        let first = factory.next_packet(&target());
        let second = factory.next_packet(&target());
        assert_eq!(first.len(), 512);
        assert!(first.as_bytes().iter().all(|&b| b == b'X'));
        assert_eq!(first, second);
        assert_eq!(PayloadFactory::new(0).payload_size(), 0);
    }
}
