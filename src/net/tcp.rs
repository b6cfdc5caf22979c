use std::net::Ipv4Addr;

use pnet_packet::tcp::TcpPacket;

use super::checksum::{fold, sum_words};
use crate::constants::{
    SYN_WINDOW_SIZE, TCP_CHECKSUM_OFFSET, TCP_FLAG_SYN, TCP_HEADER_LENGTH, TCP_HEADER_WORDS,
    TCP_PROTOCOL_NUM,
};
use crate::types::{Endpoint, Packet};

/// Represents the structure of a TCP header without options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    /// Source port (16 bits)
    pub source_port: u16,
    /// Destination port (16 bits)
    pub destination_port: u16,
    /// Sequence number (32 bits)
    pub sequence_number: u32,
    /// Acknowledgment number (32 bits)
    pub ack_number: u32,
    /// Data offset (4 bits) - Number of 32-bit words in header
    pub data_offset: u8,
    /// Control flags, CWR in the high bit down to FIN in the low bit
    pub flags: u8,
    /// Window size (16 bits)
    pub window: u16,
    /// Checksum (16 bits)
    pub checksum: u16,
    /// Urgent pointer (16 bits)
    pub urgent_pointer: u16,
}

/// Inputs for one SYN segment. The sequence number is chosen by the caller so
/// that encoding stays deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentParams {
    pub source: Endpoint,
    pub destination: Endpoint,
    pub sequence_number: u32,
}

impl SegmentParams {
    pub fn new(source: Endpoint, destination: Endpoint, sequence_number: u32) -> Self {
        Self {
            source,
            destination,
            sequence_number,
        }
    }

    fn header(&self) -> TcpHeader {
        TcpHeader {
            source_port: self.source.port(),
            destination_port: self.destination.port(),
            sequence_number: self.sequence_number,
            ack_number: 0,
            data_offset: TCP_HEADER_WORDS,
            flags: TCP_FLAG_SYN,
            window: SYN_WINDOW_SIZE,
            checksum: 0,
            urgent_pointer: 0,
        }
    }
}

impl TcpHeader {
    pub fn is_syn_only(&self) -> bool {
        self.flags == TCP_FLAG_SYN
    }

    pub fn pack(&self) -> [u8; TCP_HEADER_LENGTH] {
        let mut buffer = [0u8; TCP_HEADER_LENGTH];

        buffer[0..2].copy_from_slice(&self.source_port.to_be_bytes());
        buffer[2..4].copy_from_slice(&self.destination_port.to_be_bytes());
        buffer[4..8].copy_from_slice(&self.sequence_number.to_be_bytes());
        buffer[8..12].copy_from_slice(&self.ack_number.to_be_bytes());
        // Reserved bits stay zero.
        buffer[12] = self.data_offset << 4;
        buffer[13] = self.flags;
        buffer[14..16].copy_from_slice(&self.window.to_be_bytes());
        buffer[16..18].copy_from_slice(&self.checksum.to_be_bytes());
        buffer[18..20].copy_from_slice(&self.urgent_pointer.to_be_bytes());

        buffer
    }

    /// Reads the fixed part of a TCP header. Returns `None` if `bytes` is too
    /// short to hold one.
    pub fn parse(bytes: &[u8]) -> Option<TcpHeader> {
        let packet = TcpPacket::new(bytes)?;
        Some(TcpHeader {
            source_port: packet.get_source(),
            destination_port: packet.get_destination(),
            sequence_number: packet.get_sequence(),
            ack_number: packet.get_acknowledgement(),
            data_offset: packet.get_data_offset(),
            flags: bytes[13],
            window: packet.get_window(),
            checksum: packet.get_checksum(),
            urgent_pointer: packet.get_urgent_ptr(),
        })
    }
}

/// Checksum of the IPv4 pseudo-header followed by `segment`.
///
/// Pseudo header structure:
/// [Source IP (4 bytes)] + [Destination IP (4 bytes)] +
/// [Zero (1 byte)] + [Protocol (1 byte)] + [Segment length (2 bytes)]
pub fn pseudo_header_checksum(
    source: Ipv4Addr,
    destination: Ipv4Addr,
    protocol: u8,
    segment: &[u8],
) -> u16 {
    let mut pseudo_header = [0u8; 12];
    pseudo_header[0..4].copy_from_slice(&source.octets());
    pseudo_header[4..8].copy_from_slice(&destination.octets());
    pseudo_header[9] = protocol;
    pseudo_header[10..12].copy_from_slice(&(segment.len() as u16).to_be_bytes());

    // The pseudo header is 12 bytes, so word alignment carries over into the segment.
    let sum = sum_words(sum_words(0, &pseudo_header), segment);
    !fold(sum)
}

/// Encodes a 20-byte SYN header with a valid checksum.
pub fn build_syn_segment(params: &SegmentParams) -> Packet {
    let mut header = params.header();
    let unchecked = header.pack();
    header.checksum = pseudo_header_checksum(
        params.source.address(),
        params.destination.address(),
        TCP_PROTOCOL_NUM,
        &unchecked,
    );

    let mut segment = unchecked;
    segment[TCP_CHECKSUM_OFFSET..TCP_CHECKSUM_OFFSET + 2]
        .copy_from_slice(&header.checksum.to_be_bytes());
    Packet::from(segment.to_vec())
}

/// True when the segment's checksum field is consistent with the rest of its
/// bytes for the given addresses.
pub fn verify_segment_checksum(segment: &[u8], source: Ipv4Addr, destination: Ipv4Addr) -> bool {
    pseudo_header_checksum(source, destination, TCP_PROTOCOL_NUM, segment) == 0
}
