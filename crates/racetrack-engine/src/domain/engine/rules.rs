//! FastTrack Access Rules
//!
//! The read and write handlers from Flanagan & Freund's FastTrack
//! analysis, in the rephrased form that adds a shared-same-epoch test and
//! drops the shared-to-exclusive transition (once a variable's reads go
//! shared they stay shared, which keeps the correctness argument simple
//! and costs nothing measurable).
//!
//! Each rule starts with a lock-free fast path: a relaxed observation of
//! the variable's read (or write) word compared against the thread's
//! current epoch. Equality means this thread already accessed the
//! variable in its current epoch, nothing can have changed, and the rule
//! is done. Any other observation falls through to the slow path, which
//! re-reads authoritatively under the variable's monitor and decides.
//!
//! Reporting never aborts the update: after a race is reported the rule
//! still advances the shadow state so later accesses remain analyzable.

use super::RaceDetector;
use crate::domain::clock::Epoch;
use crate::domain::counters::Outcome;
use crate::domain::event::AccessEvent;
use crate::domain::report::RaceKind;
use crate::domain::shadow::{ThreadState, VarState};
use racetrack_core::{EngineError, EngineResult};

impl RaceDetector {
    /// The read rule
    pub(crate) fn read_rule(
        &self,
        thread: &ThreadState,
        sx: &VarState,
        access: &AccessEvent,
    ) -> EngineResult<()> {
        let tid = thread.tid();
        let epoch = thread.epoch();

        // Fast path: unsynchronized observations, sound only because a
        // hit mutates nothing.
        let r = sx.read_epoch_relaxed();
        if r == epoch {
            self.count(Outcome::ReadSameEpoch, tid);
            return Ok(());
        }
        if r.is_read_shared() {
            if let Some(map) = sx.read_map() {
                if map.get(tid) == epoch {
                    self.count(Outcome::ReadSharedSameEpoch, tid);
                    return Ok(());
                }
            }
        }

        let _monitor = sx.lock();
        let vector = thread.vector();
        let r = sx.read_epoch();
        let w = sx.write_epoch();

        let w_tid = w.tid();
        if w_tid != tid && !w.leq(&vector) {
            self.count(Outcome::WriteReadRace, tid);
            self.report_race(RaceKind::WriteRead, w_tid, tid, sx, &vector, epoch, access);
            // Best-effort recovery: leave the read state as it was.
            return Ok(());
        }

        if !r.is_read_shared() {
            let r_tid = r.tid();
            if r_tid == tid || r.leq(&vector) {
                self.count(Outcome::ReadExclusive, tid);
                sx.set_read_epoch(epoch);
            } else {
                // Two unordered readers: go shared. The map is sized for
                // every possible tid, so both the previous reader and
                // this one fit.
                self.count(Outcome::ReadShare, tid);
                let map = sx.read_map_or_init(self.max_tid());
                map.set(r_tid, r);
                map.set(tid, epoch);
                sx.set_read_epoch(Epoch::READ_SHARED);
            }
        } else {
            self.count(Outcome::ReadShared, tid);
            let map = sx
                .read_map()
                .ok_or(EngineError::ShadowStateCorrupted(
                    "read epoch is SHARED but no reader map exists",
                ))?;
            map.set(tid, epoch);
        }
        Ok(())
    }

    /// The write rule
    pub(crate) fn write_rule(
        &self,
        thread: &ThreadState,
        sx: &VarState,
        access: &AccessEvent,
    ) -> EngineResult<()> {
        let tid = thread.tid();
        let epoch = thread.epoch();

        // Fast path.
        if sx.write_epoch_relaxed() == epoch {
            self.count(Outcome::WriteSameEpoch, tid);
            return Ok(());
        }

        let _monitor = sx.lock();
        let vector = thread.vector();

        let w = sx.write_epoch();
        let w_tid = w.tid();
        if w_tid != tid && !w.leq(&vector) {
            self.count(Outcome::WriteWriteRace, tid);
            self.report_race(RaceKind::WriteWrite, w_tid, tid, sx, &vector, epoch, access);
        }

        let r = sx.read_epoch();
        if !r.is_read_shared() {
            let r_tid = r.tid();
            if r_tid != tid && !r.leq(&vector) {
                self.count(Outcome::ReadWriteRace, tid);
                self.report_race(RaceKind::ReadWrite, r_tid, tid, sx, &vector, epoch, access);
            } else {
                self.count(Outcome::WriteExclusive, tid);
            }
        } else {
            let map = sx
                .read_map()
                .ok_or(EngineError::ShadowStateCorrupted(
                    "read epoch is SHARED but no reader map exists",
                ))?;
            if map.any_gt(&vector) {
                // Every shared reader this write is unordered with gets
                // its own report, in ascending tid order.
                let mut start = 0;
                while let Some(prev_reader) = map.next_gt(&vector, start) {
                    self.report_race(
                        RaceKind::SharedReadWrite,
                        prev_reader,
                        tid,
                        sx,
                        &vector,
                        epoch,
                        access,
                    );
                    start = prev_reader.as_usize() + 1;
                }
                self.count(Outcome::SharedWriteRace, tid);
            } else {
                self.count(Outcome::WriteShared, tid);
            }
        }

        // The write itself lands regardless of what was reported.
        sx.set_write_epoch(epoch);
        Ok(())
    }
}
