//! Shadow State
//!
//! Analysis metadata mirroring the target program's memory and threads:
//!
//! - [`var::VarState`] — per memory location: last write/read epochs and
//!   the shared-read map
//! - [`thread::ThreadState`] — per thread: vector clock and current epoch,
//!   plus the registry that handles tid recycling
//! - [`sync`] — clocks for locks, volatiles, barriers, and class
//!   initialization
//!
//! Each piece carries its own monitor; the engine never holds two of the
//! global tables' monitors at once.

pub mod sync;
pub mod thread;
pub mod var;

pub use sync::{BarrierState, ClassInitTable, LockState, SyncTables, VolatileState};
pub use thread::{RoundClock, ThreadRegistry, ThreadState};
pub use var::{ReadMap, SampleState, VarState};
