//! Logical Time
//!
//! The two primitives the whole analysis is built from:
//!
//! - [`Epoch`] — a `(tid, clock)` pair packed into one word, cheap enough
//!   to compare on every instrumented access
//! - [`VectorClock`] — a growable tid-indexed clock vector whose pointwise
//!   max and per-tid tick define the happens-before order
//!
//! The FastTrack observation (Flanagan & Freund, PLDI 2009) is that most
//! variables are totally ordered by a single epoch, so full vector clocks
//! are only materialized for the shared-read minority.

pub mod epoch;
pub mod vector;

pub use epoch::Epoch;
pub use vector::{VectorClock, INIT_VECTOR_CLOCK_SIZE};
