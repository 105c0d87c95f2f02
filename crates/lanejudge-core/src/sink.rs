//! Results output
//!
//! Where finished races go: the console, an external big-font renderer, or
//! a JSON stream for display tools. The session loop only talks to the
//! [`ResultsSink`] trait.

use serde::Serialize;
use std::io::{self, Stdout, Write};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use crate::history::{HistoryEntry, ResultHistory};

/// Destination for race results
pub trait ResultsSink {
    /// Announce the winning lane (1-based)
    fn announce_winner(&mut self, lane: usize) -> io::Result<()>;

    /// Announce the lane times of the race just finished
    fn announce_times(&mut self, times: &[f64]) -> io::Result<()>;

    /// Show the recent-race history, newest first
    fn announce_history(&mut self, history: &ResultHistory) -> io::Result<()>;
}

impl<T: ResultsSink + ?Sized> ResultsSink for Box<T> {
    fn announce_winner(&mut self, lane: usize) -> io::Result<()> {
        (**self).announce_winner(lane)
    }

    fn announce_times(&mut self, times: &[f64]) -> io::Result<()> {
        (**self).announce_times(times)
    }

    fn announce_history(&mut self, history: &ResultHistory) -> io::Result<()> {
        (**self).announce_history(history)
    }
}

fn format_times(times: &[f64], separator: &str) -> String {
    times
        .iter()
        .map(|t| format!("{:1.4}", t))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Plain-text results
pub struct ConsoleSink<W> {
    out: W,
}

impl ConsoleSink<Stdout> {
    /// Console sink on stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Create a sink writing to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the sink, returning its writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultsSink for ConsoleSink<W> {
    fn announce_winner(&mut self, lane: usize) -> io::Result<()> {
        writeln!(self.out, "Lane {}", lane)?;
        self.out.flush()
    }

    fn announce_times(&mut self, times: &[f64]) -> io::Result<()> {
        writeln!(self.out, "\t{}", format_times(times, "\t"))?;
        self.out.flush()
    }

    fn announce_history(&mut self, history: &ResultHistory) -> io::Result<()> {
        writeln!(self.out, "\nPrevious results:")?;
        for entry in history.iter_recent() {
            writeln!(self.out, "\t{}", format_times(&entry.times, "\t"))?;
        }
        self.out.flush()
    }
}

/// Escape sequence clearing the terminal and homing the cursor
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";

/// Results rendered by external programs (e.g. `toilet` banners).
///
/// Each command is an argv list; the lane or the formatted times are
/// appended as extra arguments. If a command can't be run, the console
/// fallback prints the same information.
pub struct CommandSink<W = Stdout> {
    winner_command: Vec<String>,
    times_command: Vec<String>,
    clear_screen: bool,
    fallback: ConsoleSink<W>,
}

impl CommandSink {
    /// Create a sink running the given renderer commands, falling back to stdout
    pub fn new(winner_command: Vec<String>, times_command: Vec<String>, clear_screen: bool) -> Self {
        Self::with_fallback(winner_command, times_command, clear_screen, io::stdout())
    }
}

impl<W: Write> CommandSink<W> {
    /// Create a sink whose screen clearing and fallback text go to `out`
    pub fn with_fallback(
        winner_command: Vec<String>,
        times_command: Vec<String>,
        clear_screen: bool,
        out: W,
    ) -> Self {
        Self {
            winner_command,
            times_command,
            clear_screen,
            fallback: ConsoleSink::new(out),
        }
    }

    /// Consume the sink, returning the fallback writer
    pub fn into_inner(self) -> W {
        self.fallback.into_inner()
    }

    /// Run `argv` plus `extra` with inherited stdio; false if it didn't run cleanly
    fn run(argv: &[String], extra: &[String]) -> bool {
        let Some((program, args)) = argv.split_first() else {
            return false;
        };
        debug!("Running display command {:?} {:?}", argv, extra);
        match Command::new(program)
            .args(args)
            .args(extra)
            .stdin(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => true,
            Ok(status) => {
                warn!("Display command {} exited with {}", program, status);
                false
            }
            Err(e) => {
                warn!("Failed to run display command {}: {}", program, e);
                false
            }
        }
    }
}

impl<W: Write> ResultsSink for CommandSink<W> {
    fn announce_winner(&mut self, lane: usize) -> io::Result<()> {
        if self.clear_screen {
            self.fallback.out.write_all(CLEAR_SCREEN.as_bytes())?;
            self.fallback.out.flush()?;
        }
        if !Self::run(&self.winner_command, &[format!("Lane {}", lane)]) {
            self.fallback.announce_winner(lane)?;
        }
        Ok(())
    }

    fn announce_times(&mut self, times: &[f64]) -> io::Result<()> {
        let args: Vec<String> = times.iter().map(|t| format!("{:1.4}", t)).collect();
        if !Self::run(&self.times_command, &args) {
            self.fallback.announce_times(times)?;
        }
        Ok(())
    }

    fn announce_history(&mut self, history: &ResultHistory) -> io::Result<()> {
        self.fallback.announce_history(history)
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SinkEvent<'a> {
    Winner { lane: usize },
    Times { times: &'a [f64] },
    History { recent: Vec<&'a HistoryEntry> },
}

/// One JSON object per line, for external display tools
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink writing JSON lines to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the sink, returning its writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: &SinkEvent<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write> ResultsSink for JsonLinesSink<W> {
    fn announce_winner(&mut self, lane: usize) -> io::Result<()> {
        self.emit(&SinkEvent::Winner { lane })
    }

    fn announce_times(&mut self, times: &[f64]) -> io::Result<()> {
        self.emit(&SinkEvent::Times { times })
    }

    fn announce_history(&mut self, history: &ResultHistory) -> io::Result<()> {
        self.emit(&SinkEvent::History {
            recent: history.iter_recent().collect(),
        })
    }
}
