//! Rule-Outcome Counters
//!
//! Every access resolves to exactly one FastTrack rule outcome and every
//! sync event to one operation class; the engine counts them per tid so a
//! run can be characterized after the fact ("how often did the same-epoch
//! fast path hit", "how many accesses ever went shared"). Counting uses
//! one relaxed `fetch_add` on a tid-indexed cell, cheap enough to leave on
//! permanently.

use racetrack_core::Tid;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Every countable outcome and operation class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Outcome {
    /// Read at the variable's current read epoch
    ReadSameEpoch,
    /// Shared-mode read at the reader's recorded epoch
    ReadSharedSameEpoch,
    /// Ordered read replacing the previous read epoch
    ReadExclusive,
    /// Read that transitioned the variable to shared mode
    ReadShare,
    /// Read recorded into an already-shared variable
    ReadShared,
    /// Write at the variable's current write epoch
    WriteSameEpoch,
    /// Ordered write over an exclusive reader
    WriteExclusive,
    /// Ordered write over shared readers
    WriteShared,
    /// Unordered write observed by a read
    WriteReadRace,
    /// Unordered write observed by a write
    WriteWriteRace,
    /// Unordered exclusive read observed by a write
    ReadWriteRace,
    /// Unordered shared reads observed by a write
    SharedWriteRace,
    /// Monitor acquire
    Acquire,
    /// Monitor release
    Release,
    /// Thread fork
    Fork,
    /// Thread join
    Join,
    /// Barrier enter or exit
    Barrier,
    /// Wait release/reacquire pair halves
    Wait,
    /// Volatile access
    Volatile,
    /// Everything else (stop, notify, class events)
    Other,
}

impl Outcome {
    /// All outcomes, in display order
    pub const ALL: [Outcome; 20] = [
        Outcome::ReadSameEpoch,
        Outcome::ReadSharedSameEpoch,
        Outcome::ReadExclusive,
        Outcome::ReadShare,
        Outcome::ReadShared,
        Outcome::WriteSameEpoch,
        Outcome::WriteExclusive,
        Outcome::WriteShared,
        Outcome::WriteReadRace,
        Outcome::WriteWriteRace,
        Outcome::ReadWriteRace,
        Outcome::SharedWriteRace,
        Outcome::Acquire,
        Outcome::Release,
        Outcome::Fork,
        Outcome::Join,
        Outcome::Barrier,
        Outcome::Wait,
        Outcome::Volatile,
        Outcome::Other,
    ];

    /// Stable display name
    pub fn name(self) -> &'static str {
        match self {
            Outcome::ReadSameEpoch => "Read Same Epoch",
            Outcome::ReadSharedSameEpoch => "ReadShared Same Epoch",
            Outcome::ReadExclusive => "Read Exclusive",
            Outcome::ReadShare => "Read Share",
            Outcome::ReadShared => "Read Shared",
            Outcome::WriteSameEpoch => "Write Same Epoch",
            Outcome::WriteExclusive => "Write Exclusive",
            Outcome::WriteShared => "Write Shared",
            Outcome::WriteReadRace => "Write-Read Race",
            Outcome::WriteWriteRace => "Write-Write Race",
            Outcome::ReadWriteRace => "Read-Write Race",
            Outcome::SharedWriteRace => "Shared-Write Race",
            Outcome::Acquire => "Acquire",
            Outcome::Release => "Release",
            Outcome::Fork => "Fork",
            Outcome::Join => "Join",
            Outcome::Barrier => "Barrier",
            Outcome::Wait => "Wait",
            Outcome::Volatile => "Volatile",
            Outcome::Other => "Other",
        }
    }

    const READ_OUTCOMES: [Outcome; 6] = [
        Outcome::ReadSameEpoch,
        Outcome::ReadSharedSameEpoch,
        Outcome::ReadExclusive,
        Outcome::ReadShare,
        Outcome::ReadShared,
        Outcome::WriteReadRace,
    ];

    const WRITE_OUTCOMES: [Outcome; 6] = [
        Outcome::WriteSameEpoch,
        Outcome::WriteExclusive,
        Outcome::WriteShared,
        Outcome::WriteWriteRace,
        Outcome::ReadWriteRace,
        Outcome::SharedWriteRace,
    ];

    const SYNC_OUTCOMES: [Outcome; 8] = [
        Outcome::Acquire,
        Outcome::Release,
        Outcome::Fork,
        Outcome::Join,
        Outcome::Barrier,
        Outcome::Wait,
        Outcome::Volatile,
        Outcome::Other,
    ];
}

/// One outcome's per-tid cells
struct TidCounter {
    cells: Box<[AtomicU64]>,
}

impl TidCounter {
    fn new(width: usize) -> Self {
        Self {
            cells: (0..width).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    #[inline]
    fn inc(&self, tid: Tid) {
        if let Some(cell) = self.cells.get(tid.as_usize()) {
            cell.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn get(&self, tid: Tid) -> u64 {
        self.cells
            .get(tid.as_usize())
            .map(|cell| cell.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn total(&self) -> u64 {
        self.cells
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .sum()
    }
}

/// All outcome counters for one detector instance
pub struct CounterRegistry {
    counters: Vec<TidCounter>,
}

impl CounterRegistry {
    /// Counters sized for tids below `max_tid`
    pub fn new(max_tid: usize) -> Self {
        Self {
            counters: (0..Outcome::ALL.len())
                .map(|_| TidCounter::new(max_tid))
                .collect(),
        }
    }

    /// Count one occurrence of `outcome` on `tid`
    #[inline]
    pub fn inc(&self, outcome: Outcome, tid: Tid) {
        self.counters[outcome as usize].inc(tid);
    }

    /// `outcome` count for one tid
    pub fn get(&self, outcome: Outcome, tid: Tid) -> u64 {
        self.counters[outcome as usize].get(tid)
    }

    /// `outcome` count across all tids
    pub fn total(&self, outcome: Outcome) -> u64 {
        self.counters[outcome as usize].total()
    }

    /// Aggregate totals for the end-of-run summary
    pub fn summary(&self) -> CounterSummary {
        let per_outcome = Outcome::ALL.map(|outcome| (outcome, self.total(outcome)));
        let reads = Outcome::READ_OUTCOMES
            .iter()
            .map(|&o| self.total(o))
            .sum::<u64>();
        let writes = Outcome::WRITE_OUTCOMES
            .iter()
            .map(|&o| self.total(o))
            .sum::<u64>();
        let sync = Outcome::SYNC_OUTCOMES
            .iter()
            .map(|&o| self.total(o))
            .sum::<u64>();
        CounterSummary {
            per_outcome,
            total_reads: reads,
            total_writes: writes,
            total_accesses: reads + writes,
            total_ops: reads + writes + sync,
        }
    }
}

/// Aggregated totals at a point in time
#[derive(Debug, Clone)]
pub struct CounterSummary {
    /// Total per outcome, in display order
    pub per_outcome: [(Outcome, u64); 20],
    /// All read-rule outcomes
    pub total_reads: u64,
    /// All write-rule outcomes
    pub total_writes: u64,
    /// Reads plus writes
    pub total_accesses: u64,
    /// Accesses plus sync operations
    pub total_ops: u64,
}

impl fmt::Display for CounterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (outcome, total) in &self.per_outcome {
            if *total > 0 {
                writeln!(f, "{:<22} {}", outcome.name(), total)?;
            }
        }
        writeln!(f, "{:<22} {}", "Total Reads", self.total_reads)?;
        writeln!(f, "{:<22} {}", "Total Writes", self.total_writes)?;
        writeln!(f, "{:<22} {}", "Total Access Ops", self.total_accesses)?;
        write!(f, "{:<22} {}", "Total Ops", self.total_ops)
    }
}
