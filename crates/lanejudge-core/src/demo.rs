//! Demo Mode - Simulated race timer for testing
//!
//! Produces a banner and realistic result lines without a physical timer,
//! so the console can be exercised end to end. Roughly one run in ten is a
//! null race (gate opened with no cars). Like the real timer it has to be
//! rearmed after every run.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::protocol::{LaneCount, LinkOpener, ProtocolError, TimerLink, REARM_BYTE};

/// Probability that a run finishes with no cars
const NULL_RACE_ODDS: f64 = 0.1;

/// Simulated timer speaking the real wire format
pub struct SimulatedTimer {
    lanes: LaneCount,
    banner_sent: bool,
    armed: bool,
    rng: StdRng,
}

impl SimulatedTimer {
    /// Create a simulated timer with `lanes` lanes
    pub fn new(lanes: LaneCount, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            lanes,
            banner_sent: false,
            armed: true,
            rng,
        }
    }

    /// True when the timer has been rearmed since its last run
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn banner(&self) -> String {
        format!("Simulated Timer v1.0 - {} Lanes found", self.lanes)
    }

    fn race_line(&mut self) -> String {
        let count = self.lanes.get();
        let mut order: Vec<usize> = (1..=count).collect();
        order.shuffle(&mut self.rng);

        if self.rng.gen_bool(NULL_RACE_ODDS) {
            return order
                .iter()
                .map(|lane| format!("{} 0.0000", lane))
                .collect::<Vec<_>>()
                .join(" ");
        }

        // Finishing times: ~3 seconds, each car a little behind the previous
        let mut elapsed = self.rng.gen_range(2.8..3.4);
        let mut pairs = Vec::with_capacity(count);
        for lane in order {
            pairs.push(format!("{} {:.4}", lane, elapsed));
            elapsed += self.rng.gen_range(0.0005..0.25);
        }
        pairs.join(" ")
    }
}

impl TimerLink for SimulatedTimer {
    fn read_line(&mut self) -> Result<String, ProtocolError> {
        if !self.banner_sent {
            self.banner_sent = true;
            return Ok(self.banner());
        }
        if !self.armed {
            return Err(ProtocolError::SerialError(
                "simulated timer was not rearmed".to_string(),
            ));
        }
        self.armed = false;
        let line = self.race_line();
        debug!("Simulated timer line: {}", line);
        Ok(line)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ProtocolError> {
        if byte == REARM_BYTE {
            self.armed = true;
        }
        Ok(())
    }
}

/// Opener handing out [`SimulatedTimer`]s
#[derive(Debug, Clone)]
pub struct SimulatedOpener {
    lanes: LaneCount,
    seed: Option<u64>,
}

impl SimulatedOpener {
    /// Create an opener for a simulated `lanes`-lane timer
    pub fn new(lanes: LaneCount) -> Self {
        Self { lanes, seed: None }
    }

    /// Use a fixed random seed (reproducible runs)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl LinkOpener for SimulatedOpener {
    type Link = SimulatedTimer;

    fn open(&mut self) -> Result<Self::Link, ProtocolError> {
        Ok(SimulatedTimer::new(self.lanes, self.seed))
    }

    fn target(&self) -> String {
        format!("simulated {}-lane timer", self.lanes)
    }
}
