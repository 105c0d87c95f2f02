//! Timer line decoding
//!
//! Decodes the two line shapes a race timer produces:
//! - the init banner, e.g. `SuperDuper Timer v9.3 - 4 Lanes found`
//! - a result line, e.g. `1 3.2001 2 3.5512 3 0.0000 4 0.0000`
//!
//! Result lines list `(lane, seconds)` pairs in finishing order. A time of
//! exactly zero means the lane did not finish before the timer gave up,
//! and nothing after it on the line carries meaning.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ProtocolError;

/// Number of lanes reported by the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum LaneCount {
    /// Two-lane track
    Two,
    /// Four-lane track
    Four,
    /// Eight-lane track
    Eight,
}

impl LaneCount {
    /// Number of lanes as an integer
    pub fn get(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

impl TryFrom<usize> for LaneCount {
    type Error = ProtocolError;

    fn try_from(lanes: usize) -> Result<Self, Self::Error> {
        match lanes {
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(ProtocolError::UnsupportedLaneCount(other)),
        }
    }
}

impl From<LaneCount> for usize {
    fn from(lanes: LaneCount) -> Self {
        lanes.get()
    }
}

impl fmt::Display for LaneCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// One completed run as reported by the timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    /// Elapsed seconds per lane, indexed by `lane - 1`; zero means no finish
    pub times: Vec<f64>,
    /// 1-based lane reported first by the timer, or 0 for a null race
    pub winning_lane: usize,
}

impl RaceResult {
    /// An all-zero result with no winner
    pub fn null(lanes: LaneCount) -> Self {
        Self {
            times: vec![0.0; lanes.get()],
            winning_lane: 0,
        }
    }

    /// True when no lane finished and the run has to be redone
    pub fn is_null(&self) -> bool {
        self.winning_lane == 0
    }

    /// Winning lane, if any
    pub fn winner(&self) -> Option<usize> {
        (self.winning_lane > 0).then_some(self.winning_lane)
    }

    /// Elapsed time for a 1-based lane
    pub fn time_for(&self, lane: usize) -> Option<f64> {
        lane.checked_sub(1).and_then(|i| self.times.get(i).copied())
    }
}

/// Lane-count digits in the order they are searched for.
///
/// This is a precedence scan, not a rightmost-digit search: any '8' in the
/// banner (a firmware version such as `v8.1` included) wins over a later
/// '4'. Timers in the field depend on this exact behavior.
const LANE_DIGIT_PRIORITY: [(u8, LaneCount); 3] = [
    (b'8', LaneCount::Eight),
    (b'4', LaneCount::Four),
    (b'2', LaneCount::Two),
];

/// Decode the lane count from the timer's init banner.
pub fn parse_init_banner(line: &str) -> Result<LaneCount, ProtocolError> {
    let bytes = line.as_bytes();
    LANE_DIGIT_PRIORITY
        .iter()
        .find(|(digit, _)| bytes.contains(digit))
        .map(|(_, lanes)| *lanes)
        .ok_or_else(|| ProtocolError::UnparseableBanner(line.trim_end().to_string()))
}

/// Decode a race result line for a timer with `lanes` lanes.
///
/// Pairs are read in order until `lanes` pairs have been consumed or a zero
/// time is found. Missing or unreadable tokens count as zero, matching the
/// timer's habit of padding unfinished runs. A non-zero time attached to a
/// lane outside `1..=lanes` is rejected as a garbled line.
pub fn parse_result_line(line: &str, lanes: LaneCount) -> Result<RaceResult, ProtocolError> {
    let mut result = RaceResult::null(lanes);
    let mut tokens = line.split_whitespace();

    for slot in 0..lanes.get() {
        let lane = tokens
            .next()
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or(0);
        let elapsed = tokens
            .next()
            .and_then(|t| t.parse::<f64>().ok())
            .unwrap_or(0.0);

        if elapsed == 0.0 {
            break;
        }
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(ProtocolError::MalformedResult(line.trim_end().to_string()));
        }
        if lane == 0 || lane > lanes.get() {
            return Err(ProtocolError::MalformedResult(line.trim_end().to_string()));
        }

        if slot == 0 {
            result.winning_lane = lane;
        }
        result.times[lane - 1] = elapsed;
    }

    Ok(result)
}
