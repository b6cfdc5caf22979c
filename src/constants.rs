//! Defaults and limits shared by the CLI, the packet factories and the scheduler.

use std::ops::RangeInclusive;
use std::time::Duration;

pub const DEFAULT_DURATION_SECS: i64 = 10;
pub const DEFAULT_RATE: u32 = 1000;
pub const DEFAULT_PAYLOAD_SIZE: usize = 512;

/// Upper bound accepted for `rate`, in packets per second.
pub const MAX_RATE: u32 = 10_000;
/// 65535 - 20 (IPv4 header) - 8 (UDP header)
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Nominal length of one pacing window.
pub const WINDOW: Duration = Duration::from_secs(1);

pub const TCP_PROTOCOL_NUM: u8 = 6;
pub const TCP_HEADER_LENGTH: usize = 20;
pub const TCP_HEADER_WORDS: u8 = 5;
pub const TCP_FLAG_SYN: u8 = 0x02;
pub const TCP_CHECKSUM_OFFSET: usize = 16;
pub const SYN_WINDOW_SIZE: u16 = 5840;

pub const SEQUENCE_RANGE: RangeInclusive<u32> = 10_000..=999_999;
pub const SYN_SOURCE_PORTS: RangeInclusive<u16> = 40_000..=60_000;
