pub mod constants;
pub mod error;
pub mod factory;
pub mod flood;
pub mod hextools;
pub mod net;
pub mod transport;
pub mod types;

pub use error::{FloodError, SendError, SetupError, ValidationError};
pub use factory::{PacketFactory, PayloadFactory, SynSegmentFactory};
pub use flood::{Clock, FloodReport, FloodScheduler, FloodState, Progress, StopFlag, SystemClock};
pub use transport::{RawTcpTransport, Transport, UdpTransport};
pub use types::{Endpoint, FloodJob, Packet};
