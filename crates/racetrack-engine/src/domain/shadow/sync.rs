//! Synchronization-Object Shadow State
//!
//! Clocks attached to the synchronization vocabulary of the target
//! program: one vector clock per lock, per volatile variable, and per
//! class, plus a per-barrier accumulator that collects every participant's
//! clock for a round.
//!
//! All of these are created lazily on first use; the tables hand out
//! `Arc` handles so event handlers never hold a table shard lock across a
//! clock operation.

use crate::domain::clock::VectorClock;
use crate::domain::shadow::thread::RoundClock;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use racetrack_core::{BarrierId, ClassId, LockId, VolatileId};
use std::collections::HashMap;
use std::sync::Arc;

/// Clock released into and acquired from an application lock
pub struct LockState {
    clock: Mutex<VectorClock>,
}

impl LockState {
    fn new() -> Self {
        Self {
            clock: Mutex::new(VectorClock::new()),
        }
    }

    /// The lock's clock; the application holds the lock itself during
    /// acquire/release events, so contention here is incidental
    #[inline]
    pub fn clock(&self) -> MutexGuard<'_, VectorClock> {
        self.clock.lock()
    }
}

/// Clock carried by a volatile variable (acts like a lock for ordering)
pub struct VolatileState {
    clock: Mutex<VectorClock>,
}

impl VolatileState {
    fn new() -> Self {
        Self {
            clock: Mutex::new(VectorClock::new()),
        }
    }

    /// The volatile's clock
    #[inline]
    pub fn clock(&self) -> MutexGuard<'_, VectorClock> {
        self.clock.lock()
    }
}

/// Per-barrier accumulator, one round at a time.
///
/// Every entering thread maxes its clock into the current round's
/// accumulator and keeps a handle to it; the first thread to exit rotates
/// the accumulator so the next round starts clean. Late exiters still hold
/// the old round's handle, so no thread ever reads a clock from a round it
/// did not participate in.
pub struct BarrierState {
    round: Mutex<RoundClock>,
}

impl BarrierState {
    fn new() -> Self {
        Self {
            round: Mutex::new(Arc::new(Mutex::new(VectorClock::new()))),
        }
    }

    /// Fold `thread_vector` into the current round and return its handle
    pub fn enter(&self, thread_vector: &VectorClock) -> RoundClock {
        let round = self.round.lock();
        let accumulator = Arc::clone(&round);
        accumulator.lock().max_with(thread_vector);
        accumulator
    }

    /// Called at exit with the handle stored at enter; rotates the
    /// accumulator the first time a round's participant leaves
    pub fn retire(&self, entered: &RoundClock) {
        let mut round = self.round.lock();
        if Arc::ptr_eq(&round, entered) {
            *round = Arc::new(Mutex::new(VectorClock::new()));
        }
    }
}

/// Class-initialization times, all behind one monitor.
///
/// The table is tiny (one entry per class that ever mattered) and is
/// consulted only on static accesses and class-init events, so a single
/// lock is cheaper than sharding.
pub struct ClassInitTable {
    inner: Mutex<HashMap<ClassId, VectorClock>>,
}

impl ClassInitTable {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` against the class's init clock, creating a zero clock on
    /// first touch
    pub fn with_clock<R>(&self, class: ClassId, f: impl FnOnce(&mut VectorClock) -> R) -> R {
        let mut table = self.inner.lock();
        f(table.entry(class).or_default())
    }
}

/// Lazily-populated shadow state for every sync object the stream names
pub struct SyncTables {
    locks: DashMap<LockId, Arc<LockState>>,
    volatiles: DashMap<VolatileId, Arc<VolatileState>>,
    barriers: DashMap<BarrierId, Arc<BarrierState>>,
    class_init: ClassInitTable,
}

impl SyncTables {
    /// Create empty tables
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
            volatiles: DashMap::new(),
            barriers: DashMap::new(),
            class_init: ClassInitTable::new(),
        }
    }

    /// Shadow state for `lock`, created on first use
    pub fn lock_state(&self, lock: LockId) -> Arc<LockState> {
        self.locks
            .entry(lock)
            .or_insert_with(|| Arc::new(LockState::new()))
            .clone()
    }

    /// Shadow state for `volatile`, created on first use
    pub fn volatile_state(&self, volatile: VolatileId) -> Arc<VolatileState> {
        self.volatiles
            .entry(volatile)
            .or_insert_with(|| Arc::new(VolatileState::new()))
            .clone()
    }

    /// Shadow state for `barrier`, created on first use
    pub fn barrier_state(&self, barrier: BarrierId) -> Arc<BarrierState> {
        self.barriers
            .entry(barrier)
            .or_insert_with(|| Arc::new(BarrierState::new()))
            .clone()
    }

    /// The class-initialization table
    #[inline]
    pub fn class_init(&self) -> &ClassInitTable {
        &self.class_init
    }

    /// Drop a lock's shadow when its referent dies
    pub fn purge_lock(&self, lock: LockId) {
        self.locks.remove(&lock);
    }

    /// Drop a volatile's shadow when its referent dies
    pub fn purge_volatile(&self, volatile: VolatileId) {
        self.volatiles.remove(&volatile);
    }

    /// Drop a barrier's shadow when its referent dies
    pub fn purge_barrier(&self, barrier: BarrierId) {
        self.barriers.remove(&barrier);
    }
}

impl Default for SyncTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racetrack_core::Tid;

    fn vc(entries: &[u64]) -> VectorClock {
        let mut v = VectorClock::new();
        for (idx, &clock) in entries.iter().enumerate() {
            v.set(Tid::new(idx), clock);
        }
        v
    }

    #[test]
    fn lock_state_is_lazily_created_and_stable() {
        let tables = SyncTables::new();
        let a = tables.lock_state(LockId::new(1));
        a.clock().set(Tid::new(0), 7);

        let b = tables.lock_state(LockId::new(1));
        assert_eq!(b.clock().get(Tid::new(0)), 7);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn purge_forgets_the_clock() {
        let tables = SyncTables::new();
        tables.lock_state(LockId::new(1)).clock().set(Tid::new(0), 7);
        tables.purge_lock(LockId::new(1));
        assert_eq!(tables.lock_state(LockId::new(1)).clock().get(Tid::new(0)), 0);

        tables
            .volatile_state(VolatileId::new(2))
            .clock()
            .set(Tid::new(0), 3);
        tables.purge_volatile(VolatileId::new(2));
        assert_eq!(
            tables
                .volatile_state(VolatileId::new(2))
                .clock()
                .get(Tid::new(0)),
            0
        );

        let old_round = tables.barrier_state(BarrierId::new(3)).enter(&vc(&[1]));
        tables.purge_barrier(BarrierId::new(3));
        let new_round = tables.barrier_state(BarrierId::new(3)).enter(&vc(&[]));
        assert!(!Arc::ptr_eq(&old_round, &new_round));
    }

    #[test]
    fn class_init_defaults_to_zero_clock() {
        let tables = SyncTables::new();
        let size = tables
            .class_init()
            .with_clock(ClassId::new(3), |clock| clock.size());
        assert_eq!(size, 0);

        tables
            .class_init()
            .with_clock(ClassId::new(3), |clock| clock.set(Tid::new(1), 5));
        let value = tables
            .class_init()
            .with_clock(ClassId::new(3), |clock| clock.get(Tid::new(1)));
        assert_eq!(value, 5);
    }

    #[test]
    fn barrier_round_accumulates_participants() {
        let tables = SyncTables::new();
        let barrier = tables.barrier_state(BarrierId::new(0));

        let r0 = barrier.enter(&vc(&[3, 0, 0]));
        let r1 = barrier.enter(&vc(&[0, 5, 0]));
        assert!(Arc::ptr_eq(&r0, &r1));

        let acc = r0.lock();
        assert_eq!(acc.get(Tid::new(0)), 3);
        assert_eq!(acc.get(Tid::new(1)), 5);
    }

    #[test]
    fn first_exit_rotates_the_round() {
        let tables = SyncTables::new();
        let barrier = tables.barrier_state(BarrierId::new(0));

        let old_round = barrier.enter(&vc(&[3, 0]));
        barrier.retire(&old_round);

        // A later exiter from the same round finds the old handle intact...
        assert_eq!(old_round.lock().get(Tid::new(0)), 3);
        barrier.retire(&old_round);

        // ...while new entrants accumulate into a fresh clock.
        let new_round = barrier.enter(&vc(&[0, 9]));
        assert!(!Arc::ptr_eq(&old_round, &new_round));
        assert_eq!(new_round.lock().get(Tid::new(0)), 0);
        assert_eq!(new_round.lock().get(Tid::new(1)), 9);
    }
}
