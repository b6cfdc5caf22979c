pub mod checksum;
pub mod ip;
pub mod tcp;

pub use checksum::rfc1071_checksum as checksum;
pub use ip::discover_source_address;
pub use tcp::{build_syn_segment, pseudo_header_checksum, SegmentParams, TcpHeader};
