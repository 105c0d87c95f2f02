//! Scripted stand-ins for the timer, the operator and the display.

#![allow(dead_code)]

use lanejudge_core::history::{HistoryEntry, ResultHistory};
use lanejudge_core::operator::Operator;
use lanejudge_core::protocol::{LinkOpener, ProtocolError, TimerLink};
use lanejudge_core::sink::ResultsSink;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

pub const FOUR_LANE_BANNER: &str = "SuperDuper Timer v9.3 - 4 Lanes found";
pub const TWO_LANE_BANNER: &str = "SuperDuper Timer v9.3 - 2 Lanes found";

/// Send engine logs to the test harness, which shows them for failing tests.
/// `RUST_LOG` overrides the default filter.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lanejudge_core=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Timer link replaying a fixed list of reads
pub struct ScriptedLink {
    reads: VecDeque<Result<String, ProtocolError>>,
    written: Rc<RefCell<Vec<u8>>>,
    closed: Rc<RefCell<u32>>,
}

impl TimerLink for ScriptedLink {
    fn read_line(&mut self) -> Result<String, ProtocolError> {
        self.reads.pop_front().unwrap_or(Err(ProtocolError::EndOfStream))
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ProtocolError> {
        self.written.borrow_mut().push(byte);
        Ok(())
    }

    fn close(self) {
        *self.closed.borrow_mut() += 1;
    }
}

/// One scripted open attempt: `None` fails to open
pub type OpenScript = Option<Vec<Result<String, ProtocolError>>>;

/// Opener handing out scripted links in order
pub struct ScriptedOpener {
    attempts: VecDeque<OpenScript>,
    pub opens: u32,
    pub written: Rc<RefCell<Vec<u8>>>,
    pub closed: Rc<RefCell<u32>>,
}

impl ScriptedOpener {
    pub fn new(attempts: Vec<OpenScript>) -> Self {
        Self {
            attempts: attempts.into(),
            opens: 0,
            written: Rc::new(RefCell::new(Vec::new())),
            closed: Rc::new(RefCell::new(0)),
        }
    }

    /// A link outside the script, e.g. the one that just failed
    pub fn spare_link(&self) -> ScriptedLink {
        ScriptedLink {
            reads: VecDeque::new(),
            written: Rc::clone(&self.written),
            closed: Rc::clone(&self.closed),
        }
    }

    pub fn closed_links(&self) -> u32 {
        *self.closed.borrow()
    }
}

impl LinkOpener for ScriptedOpener {
    type Link = ScriptedLink;

    fn open(&mut self) -> Result<Self::Link, ProtocolError> {
        self.opens += 1;
        match self.attempts.pop_front().flatten() {
            Some(reads) => Ok(ScriptedLink {
                reads: reads.into(),
                written: Rc::clone(&self.written),
                closed: Rc::clone(&self.closed),
            }),
            None => Err(ProtocolError::OpenFailed {
                port: "/dev/ttyTEST".to_string(),
                reason: "No such device".to_string(),
            }),
        }
    }

    fn target(&self) -> String {
        "/dev/ttyTEST".to_string()
    }
}

/// Lines read from a timer: all `Ok`
pub fn lines(lines: &[&str]) -> Vec<Result<String, ProtocolError>> {
    lines.iter().map(|l| Ok(l.to_string())).collect()
}

/// Operator who confirms every prompt and answers "continue?" from a script
#[derive(Default)]
pub struct ScriptedOperator {
    pub continue_replies: VecDeque<bool>,
    /// Confirmations left before the console "closes"; `None` is unlimited
    pub ack_budget: Option<u32>,
    pub acknowledgments: u32,
    pub notices: Vec<String>,
    /// Console output is gone: every notice fails
    pub mute: bool,
}

impl ScriptedOperator {
    pub fn continuing(replies: &[bool]) -> Self {
        Self {
            continue_replies: replies.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn saw_notice(&self, needle: &str) -> bool {
        self.notices.iter().any(|n| n.contains(needle))
    }
}

impl Operator for ScriptedOperator {
    fn notice(&mut self, message: &str) -> Result<(), ProtocolError> {
        if self.mute {
            return Err(ProtocolError::OperatorClosed);
        }
        self.notices.push(message.to_string());
        Ok(())
    }

    fn acknowledge(&mut self, prompt: &str) -> Result<(), ProtocolError> {
        if let Some(budget) = self.ack_budget.as_mut() {
            if *budget == 0 {
                return Err(ProtocolError::OperatorClosed);
            }
            *budget -= 1;
        }
        self.acknowledgments += 1;
        self.notices.push(prompt.to_string());
        Ok(())
    }

    fn continue_racing(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.continue_replies.pop_front().unwrap_or(false))
    }
}

/// Sink remembering everything it was told
#[derive(Default)]
pub struct RecordingSink {
    pub winners: Vec<usize>,
    pub times: Vec<Vec<f64>>,
    pub snapshots: Vec<Vec<HistoryEntry>>,
}

impl ResultsSink for RecordingSink {
    fn announce_winner(&mut self, lane: usize) -> io::Result<()> {
        self.winners.push(lane);
        Ok(())
    }

    fn announce_times(&mut self, times: &[f64]) -> io::Result<()> {
        self.times.push(times.to_vec());
        Ok(())
    }

    fn announce_history(&mut self, history: &ResultHistory) -> io::Result<()> {
        self.snapshots.push(history.iter_recent().cloned().collect());
        Ok(())
    }
}
