//! Timer Protocol
//!
//! Implements the line-based text protocol spoken by serial race timers.
//!
//! The timer emits two kinds of lines: an init banner after reset, which
//! names the number of lanes, and one result line per finished run. The
//! host answers each processed run with a single rearm byte.

mod error;
mod link;
mod parser;
pub mod serial;
pub mod stream;

pub use error::ProtocolError;
pub use link::{establish, DeviceOpener, LineLink, LinkOpener, LinkSession, TimerLink};
pub use parser::{parse_init_banner, parse_result_line, LaneCount, RaceResult};
pub use serial::{list_ports, open_port, PortInfo};
pub use stream::{FileChannel, SerialChannel, TimerChannel};

/// Default baud rate of the supported timers
pub const DEFAULT_BAUD_RATE: u32 = 1200;

/// Maximum line length in bytes, terminator included
pub const MAX_LINE_LEN: usize = 80;

/// Byte sent to the timer to get it ready for the next run
pub const REARM_BYTE: u8 = b' ';
