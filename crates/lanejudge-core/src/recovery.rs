//! Link recovery
//!
//! When the timer link fails, the operator is walked through power-cycling
//! the timer and reconnecting it. Every attempt waits for the operator; the
//! machine never gives up on its own, and only a closed operator console
//! (or killing the process) ends it.

use std::fmt;
use tracing::{info, warn};

use crate::operator::Operator;
use crate::protocol::{establish, LaneCount, LinkOpener, LinkSession, ProtocolError, TimerLink};

const POWER_CYCLE_INSTRUCTIONS: &str = "Wow, something's messed with your timer. Let's try again.\n\
Please power cycle your timer.\n\
If you have a USB timer, just unplug it, wait a few seconds, and reconnect\n\
it to the SAME port.";

const RECONNECT_PROMPT: &str = "\nWhen you're done, press Enter and we'll try to get reconnected.";

const RETRY_PROMPT: &str =
    "Press Enter to try again. (Ctrl-C to give up - you will lose all results.)";

/// Recovery state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// Link is healthy
    Active,
    /// Waiting for the operator to power-cycle the timer and confirm
    AwaitingOperator,
    /// Reopening the link and checking the lane count
    Reopening,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::AwaitingOperator => write!(f, "AwaitingOperator"),
            Self::Reopening => write!(f, "Reopening"),
        }
    }
}

/// Operator-guided reconnect loop for a failed timer link
#[derive(Debug)]
pub struct RecoveryStateMachine {
    state: RecoveryState,
    expected_lanes: LaneCount,
    attempts: u32,
    recoveries: u32,
}

impl RecoveryStateMachine {
    /// Create a machine guarding a link established with `expected_lanes`
    pub fn new(expected_lanes: LaneCount) -> Self {
        Self {
            state: RecoveryState::Active,
            expected_lanes,
            attempts: 0,
            recoveries: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// Lane count every reconnect must report
    pub fn expected_lanes(&self) -> LaneCount {
        self.expected_lanes
    }

    /// Operator-confirmed reconnect attempts in the latest recovery
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Completed recoveries since creation
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Take over a failed link and return a working one.
    ///
    /// The failed link is closed first. Each attempt waits for operator
    /// confirmation, reopens the link and re-reads the banner; an open
    /// failure, bad banner or different lane count sends the machine back
    /// to waiting for the operator.
    pub fn recover<O, P>(
        &mut self,
        opener: &mut O,
        operator: &mut P,
        failed: O::Link,
    ) -> Result<LinkSession<O::Link>, ProtocolError>
    where
        O: LinkOpener,
        P: Operator + ?Sized,
    {
        failed.close();
        self.attempts = 0;
        self.transition(RecoveryState::AwaitingOperator);

        operator.notice(POWER_CYCLE_INSTRUCTIONS)?;
        let mut prompt = RECONNECT_PROMPT;

        loop {
            operator.acknowledge(prompt)?;
            self.attempts += 1;
            self.transition(RecoveryState::Reopening);

            operator.notice("Opening port.")?;
            match self.reopen(opener, operator) {
                Ok(session) => {
                    self.recoveries += 1;
                    self.transition(RecoveryState::Active);
                    info!(
                        "Timer link recovered after {} attempt(s) ({} lanes)",
                        self.attempts, session.lanes
                    );
                    return Ok(session);
                }
                Err(e) => {
                    warn!("Reconnect attempt {} failed: {}", self.attempts, e);
                    self.transition(RecoveryState::AwaitingOperator);
                    operator.notice(&retry_advice(&e))?;
                    prompt = RETRY_PROMPT;
                }
            }
        }
    }

    fn reopen<O, P>(
        &self,
        opener: &mut O,
        operator: &mut P,
    ) -> Result<LinkSession<O::Link>, ProtocolError>
    where
        O: LinkOpener,
        P: Operator + ?Sized,
    {
        let session = establish(opener, operator)?;
        if session.lanes != self.expected_lanes {
            let actual = session.lanes;
            session.link.close();
            return Err(ProtocolError::LaneCountMismatch {
                expected: self.expected_lanes,
                actual,
            });
        }
        Ok(session)
    }

    fn transition(&mut self, next: RecoveryState) {
        if self.state != next {
            info!("Recovery: {} -> {}", self.state, next);
            self.state = next;
        }
    }
}

fn retry_advice(err: &ProtocolError) -> String {
    match err {
        ProtocolError::OpenFailed { .. } => format!(
            "Eek! Unable to open timer port! Please power cycle it again.\n\
             Double-check that you plugged your USB timer into the same port!\n({})",
            err
        ),
        ProtocolError::LaneCountMismatch { expected, actual } => format!(
            "Eek! Invalid number of lanes! (Expected {}, got {} from timer.)\n\
             Please power cycle your timer again and check all sensor connections.",
            expected, actual
        ),
        other => format!(
            "Eek! The timer did not identify itself ({}).\n\
             Please power cycle your timer again and check all sensor connections.",
            other
        ),
    }
}
