//! Identity Types
//!
//! Small copyable newtypes for everything the instrumentation layer names:
//! threads, locks, volatiles, classes, barriers, and static access sites.
//!
//! The engine never interprets these beyond equality and (for `Tid`)
//! indexing; they exist so that an event stream cannot confuse a lock with
//! a barrier at the type level.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Thread identifier assigned by the instrumentation layer
///
/// Tids are small non-negative integers and may be recycled after a thread
/// stops; the engine's epoch bookkeeping guarantees a reused tid resumes
/// above any clock value the previous owner reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tid(pub usize);

impl Tid {
    /// Create a new thread identifier
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying usize value
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identity of an application-level monitor (lock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockId(pub u64);

impl LockId {
    /// Create a new lock identifier
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// Identity of a volatile memory location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VolatileId(pub u64);

impl VolatileId {
    /// Create a new volatile identifier
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for VolatileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identity of a loaded class (for class-initialization ordering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u64);

impl ClassId {
    /// Create a new class identifier
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Identity of a barrier object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BarrierId(pub u64);

impl BarrierId {
    /// Create a new barrier identifier
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Static identity of an access site in the target program
///
/// One `SiteId` corresponds to one syntactic field access or array access
/// in the instrumented code. Race reports are de-duplicated per site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub u64);

impl SiteId {
    /// Create a new site identifier
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}
