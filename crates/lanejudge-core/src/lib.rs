//! # LaneJudge Core Library
//!
//! Timer protocol engine for the LaneJudge race console.

#![warn(missing_docs)]

//!
//! This library provides:
//! - Line-oriented link handling for serial race timers
//! - Decoding of the timer's init banner and race result lines
//! - Operator-guided recovery when the timer link fails
//! - A short rolling history of recent races
//! - The race session loop tying it all together
//!
//! ## Example
//!
//! ```rust,ignore
//! use lanejudge_core::prelude::*;
//!
//! let mut opener = DeviceOpener::serial("/dev/ttyUSB0", DEFAULT_BAUD_RATE);
//! let mut operator = ConsoleOperator::stdio();
//! let session = establish(&mut opener, &mut operator)?;
//!
//! let sink = ConsoleSink::new(std::io::stdout());
//! let mut judge = SessionLoop::new(opener, operator, sink, SessionOptions::default());
//! let summary = judge.run(session)?;
//! ```

pub mod config;
pub mod demo;
pub mod history;
pub mod operator;
pub mod protocol;
pub mod recovery;
pub mod session;
pub mod sink;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, JudgeConfig, OutputFormat};
    pub use crate::demo::{SimulatedOpener, SimulatedTimer};
    pub use crate::history::{HistoryEntry, ResultHistory, HISTORY_CAPACITY};
    pub use crate::operator::{ConsoleOperator, Operator};
    pub use crate::protocol::{
        establish, parse_init_banner, parse_result_line, DeviceOpener, LaneCount, LineLink,
        LinkOpener, LinkSession, ProtocolError, RaceResult, TimerLink, DEFAULT_BAUD_RATE,
    };
    pub use crate::recovery::{RecoveryState, RecoveryStateMachine};
    pub use crate::session::{RaceOutcome, SessionLoop, SessionOptions, SessionSummary};
    pub use crate::sink::{CommandSink, ConsoleSink, JsonLinesSink, ResultsSink};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
