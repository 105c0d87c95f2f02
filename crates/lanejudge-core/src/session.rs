//! Race session loop
//!
//! Runs one race after another: wait for the timer, decode the result,
//! report it, and rearm the timer when the operator wants another run.

use tracing::{debug, info, warn};

use crate::history::{HistoryEntry, ResultHistory};
use crate::operator::Operator;
use crate::protocol::{
    parse_result_line, LinkOpener, LinkSession, ProtocolError, RaceResult, TimerLink, REARM_BYTE,
};
use crate::recovery::RecoveryStateMachine;
use crate::sink::ResultsSink;

/// How one race fetch ended
#[derive(Debug)]
pub enum RaceOutcome {
    /// A lane won
    Finished(RaceResult),
    /// No lane finished; the run has to be redone
    Null,
    /// The timer link failed and needs recovery
    LinkFailure(ProtocolError),
}

/// Session behavior switches
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Send the rearm byte after each run (off when there is no physical timer)
    pub rearm: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { rearm: true }
    }
}

impl SessionOptions {
    /// Options for debug/dry-run mode: no rearm signal
    pub fn dry_run() -> Self {
        Self { rearm: false }
    }
}

/// Tallies of a finished session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Races with a winner
    pub races: u32,
    /// Runs that had to be redone
    pub null_races: u32,
    /// Completed link recoveries
    pub recoveries: u32,
}

/// The race loop, owning the opener, operator, sink and history
pub struct SessionLoop<O, P, S> {
    opener: O,
    operator: P,
    sink: S,
    history: ResultHistory,
    options: SessionOptions,
}

impl<O, P, S> SessionLoop<O, P, S>
where
    O: LinkOpener,
    P: Operator,
    S: ResultsSink,
{
    /// Create a session loop with an empty history
    pub fn new(opener: O, operator: P, sink: S, options: SessionOptions) -> Self {
        Self {
            opener,
            operator,
            sink,
            history: ResultHistory::new(),
            options,
        }
    }

    /// Recent races
    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    /// The results sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The operator console
    pub fn operator_mut(&mut self) -> &mut P {
        &mut self.operator
    }

    /// The link opener
    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Open the timer and read its banner, for the first time
    pub fn establish(&mut self) -> Result<LinkSession<O::Link>, ProtocolError> {
        crate::protocol::establish(&mut self.opener, &mut self.operator)
    }

    /// Wait for the next run and decode it.
    ///
    /// Timer trouble comes back as [`RaceOutcome::LinkFailure`]; only an
    /// operator console failure is an `Err`.
    pub fn fetch_race(
        &mut self,
        session: &mut LinkSession<O::Link>,
    ) -> Result<RaceOutcome, ProtocolError> {
        self.operator.notice("Begin racing when ready.")?;

        let outcome = session
            .link
            .read_line()
            .and_then(|line| parse_result_line(&line, session.lanes));

        Ok(match outcome {
            Ok(result) if result.is_null() => RaceOutcome::Null,
            Ok(result) => RaceOutcome::Finished(result),
            Err(e) => RaceOutcome::LinkFailure(e),
        })
    }

    /// Report a finished race and add it to the history
    fn record(&mut self, result: &RaceResult) {
        let winner = result.winning_lane;
        info!("Lane {} wins: {:?}", winner, result.times);

        if let Err(e) = self.sink.announce_winner(winner) {
            warn!("Failed to announce winner: {}", e);
        }
        if let Err(e) = self.sink.announce_times(&result.times) {
            warn!("Failed to announce times: {}", e);
        }

        self.history.push(HistoryEntry::from(result));
        if let Err(e) = self.sink.announce_history(&self.history) {
            warn!("Failed to announce history: {}", e);
        }
    }

    /// Run races until the operator stops.
    ///
    /// Link failures are handed to a [`RecoveryStateMachine`] and racing
    /// resumes on the recovered link. Only operator console failures end
    /// the session with an error.
    pub fn run(&mut self, session: LinkSession<O::Link>) -> Result<SessionSummary, ProtocolError> {
        let mut recovery = RecoveryStateMachine::new(session.lanes);
        let mut session = session;
        let mut summary = SessionSummary::default();

        self.operator.acknowledge("Press enter to continue.")?;

        loop {
            let outcome = self.fetch_race(&mut session)?;
            self.operator.notice("Run is complete. Results:")?;

            match outcome {
                RaceOutcome::Finished(result) => {
                    summary.races += 1;
                    self.record(&result);
                }
                RaceOutcome::Null => {
                    summary.null_races += 1;
                    info!("Null race");
                    self.operator.notice("Null race result! Please redo this run.")?;
                }
                RaceOutcome::LinkFailure(e) => {
                    warn!("Timer link failure: {}", e);
                    session = self.recover(&mut recovery, session)?;
                    summary.recoveries += 1;
                }
            }

            if !self.operator.continue_racing()? {
                break;
            }

            if self.options.rearm {
                debug!("Rearming timer");
                if let Err(e) = session.link.write_byte(REARM_BYTE) {
                    warn!("Failed to rearm timer: {}", e);
                    session = self.recover(&mut recovery, session)?;
                    summary.recoveries += 1;
                }
            }
        }

        info!(
            "Session over: {} races, {} null races, {} recoveries",
            summary.races, summary.null_races, summary.recoveries
        );
        session.link.close();
        Ok(summary)
    }

    fn recover(
        &mut self,
        recovery: &mut RecoveryStateMachine,
        failed: LinkSession<O::Link>,
    ) -> Result<LinkSession<O::Link>, ProtocolError> {
        self.operator
            .notice("Eek! Error reading from serial port! Please check timer.")?;
        recovery.recover(&mut self.opener, &mut self.operator, failed.link)
    }
}
