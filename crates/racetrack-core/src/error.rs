//! Engine Error Types
//!
//! Races found in the target program are *results*, not errors; they flow
//! through the report sink. The errors here are the detector's own failure
//! modes: wiring mistakes by the embedding instrumentation and exhausted
//! numeric ranges. All of them are fatal for the analysis — the engine
//! never retries and never swallows (a half-updated shadow state cannot be
//! trusted).

use crate::ids::Tid;
use std::fmt;

/// Fatal engine-side failures
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A tid at or beyond the configured `max_tid` appeared in the stream
    TidOutOfRange {
        /// The offending tid
        tid: Tid,
        /// The configured upper bound (exclusive)
        max_tid: usize,
    },

    /// An event referenced a thread that never produced `NewThread`
    UnknownThread(Tid),

    /// `NewThread` arrived twice for a tid without an intervening `Stop`
    ThreadAlreadyLive(Tid),

    /// A barrier exit arrived for a thread that never entered the barrier
    BarrierNotEntered(Tid),

    /// A thread's logical clock exceeded the representable epoch range
    ClockOverflow {
        /// The thread whose clock overflowed
        tid: Tid,
    },

    /// An impossible shadow-state shape was observed (wiring bug in the
    /// embedder or memory corruption); the detail names the branch
    ShadowStateCorrupted(&'static str),

    /// An access event's shadow slot does not match its target kind
    MismatchedShadow(Tid),

    /// `sampling_rate` outside 0..=100
    InvalidSamplingRate(u32),

    /// `max_tid` of zero or beyond the epoch tid field
    InvalidMaxTid(usize),

    /// Adaptive sampling floor outside (0, 100]
    InvalidAdaptiveFloor(f64),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TidOutOfRange { tid, max_tid } => {
                write!(f, "thread id {} outside configured bound {}", tid, max_tid)
            }
            Self::UnknownThread(tid) => {
                write!(f, "event for thread {} before its NewThread", tid)
            }
            Self::ThreadAlreadyLive(tid) => {
                write!(f, "NewThread for {} while it is still live", tid)
            }
            Self::BarrierNotEntered(tid) => {
                write!(f, "barrier exit for {} without a matching enter", tid)
            }
            Self::ClockOverflow { tid } => {
                write!(f, "logical clock for {} exceeded the epoch range", tid)
            }
            Self::ShadowStateCorrupted(detail) => {
                write!(f, "shadow state corrupted: {}", detail)
            }
            Self::MismatchedShadow(tid) => {
                write!(f, "access by {} carries a shadow of the wrong kind", tid)
            }
            Self::InvalidSamplingRate(rate) => {
                write!(f, "sampling rate {} outside 0..=100", rate)
            }
            Self::InvalidMaxTid(max_tid) => {
                write!(f, "max_tid {} unusable (must be 1..=65536)", max_tid)
            }
            Self::InvalidAdaptiveFloor(floor) => {
                write!(f, "adaptive sampling floor {} outside (0, 100]", floor)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Result alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_thread() {
        let err = EngineError::UnknownThread(Tid::new(3));
        assert!(err.to_string().contains("t3"));
    }

    #[test]
    fn display_names_the_bound() {
        let err = EngineError::TidOutOfRange {
            tid: Tid::new(70),
            max_tid: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("t70"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn errors_are_std_errors() {
        fn takes_error(_e: &dyn std::error::Error) {}
        takes_error(&EngineError::ClockOverflow { tid: Tid::new(0) });
    }
}
