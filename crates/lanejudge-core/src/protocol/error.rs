//! Protocol errors

use thiserror::Error;

use super::LaneCount;

/// Errors that can occur while talking to the race timer
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Unable to open timer port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Timer link closed")]
    EndOfStream,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unable to parse timer string: {0:?}")]
    UnparseableBanner(String),

    #[error("Unsupported lane count: {0}")]
    UnsupportedLaneCount(usize),

    #[error("Invalid number of lanes: expected {expected}, got {actual}")]
    LaneCountMismatch {
        expected: LaneCount,
        actual: LaneCount,
    },

    #[error("Malformed result line: {0}")]
    MalformedResult(String),

    #[error("Operator input closed")]
    OperatorClosed,
}

impl ProtocolError {
    /// Whether this error means the timer link can no longer be trusted.
    ///
    /// Link failures are recovered by power-cycling the timer; everything
    /// else is either fatal or handled where it occurs.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Self::EndOfStream | Self::IoError(_) | Self::SerialError(_) | Self::MalformedResult(_)
        )
    }
}
