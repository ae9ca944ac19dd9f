//! Per-Thread Shadow State
//!
//! Each observed application thread owns a [`ThreadState`]: its vector
//! clock `V` and its current epoch `E`, with the invariant `E == V[tid]`
//! at every observation point. The epoch is mirrored into an atomic word
//! so the access fast path can read it without touching the vector's
//! monitor.
//!
//! `V` is mutated only by the owning thread while it is live, with two
//! sanctioned exceptions: a parent initializes its child's clock at fork
//! before the child runs, and a joiner reads a terminated joinee's clock.
//! The monitor around `V` makes both exceptions defined behavior without
//! costing the owner more than an uncontended lock.
//!
//! The [`ThreadRegistry`] also keeps the process-wide high-water mark of
//! epochs per tid, so a recycled tid resumes above anything its previous
//! owner reached.

use crate::domain::clock::{Epoch, VectorClock};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use racetrack_core::{EngineError, EngineResult, Tid};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared handle to one barrier round's accumulating clock
pub type RoundClock = Arc<Mutex<VectorClock>>;

/// Shadow state for one observed thread
#[derive(Debug)]
pub struct ThreadState {
    tid: Tid,
    /// Mirror of `V[tid]`, readable without the vector monitor
    epoch: AtomicU64,
    vector: Mutex<VectorClock>,
    /// The barrier-round clock this thread entered with, if any
    barrier_slot: Mutex<Option<RoundClock>>,
    live: AtomicBool,
}

impl ThreadState {
    fn new(tid: Tid, initial_clock: u64) -> Self {
        let mut vector = VectorClock::new();
        vector.set(tid, initial_clock);
        Self {
            tid,
            epoch: AtomicU64::new(Epoch::make(tid, initial_clock).raw()),
            vector: Mutex::new(vector),
            barrier_slot: Mutex::new(None),
            live: AtomicBool::new(true),
        }
    }

    /// This thread's tid
    #[inline]
    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// Current epoch `E`
    #[inline]
    pub fn epoch(&self) -> Epoch {
        Epoch::from_raw(self.epoch.load(Ordering::Relaxed))
    }

    /// Lock and return the vector clock `V`
    #[inline]
    pub fn vector(&self) -> MutexGuard<'_, VectorClock> {
        self.vector.lock()
    }

    /// Is the thread still running?
    #[inline]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn refresh_epoch(&self, vector: &VectorClock) {
        self.epoch
            .store(vector.epoch_of(self.tid).raw(), Ordering::Release);
    }

    /// `V.tick(tid); E = V[tid]` — a local release step
    pub fn tick(&self) -> EngineResult<()> {
        let mut vector = self.vector.lock();
        let clock = vector.tick(self.tid);
        if clock > Epoch::MAX_CLOCK {
            return Err(EngineError::ClockOverflow { tid: self.tid });
        }
        self.refresh_epoch(&vector);
        Ok(())
    }

    /// `V.max(other); E = V[tid]` — an acquire step
    pub fn max_with(&self, other: &VectorClock) {
        let mut vector = self.vector.lock();
        vector.max_with(other);
        self.refresh_epoch(&vector);
    }

    /// `V.max(other); V.tick(tid); E = V[tid]` — acquire then advance
    pub fn max_and_tick(&self, other: &VectorClock) -> EngineResult<()> {
        let mut vector = self.vector.lock();
        vector.max_with(other);
        let clock = vector.tick(self.tid);
        if clock > Epoch::MAX_CLOCK {
            return Err(EngineError::ClockOverflow { tid: self.tid });
        }
        self.refresh_epoch(&vector);
        Ok(())
    }

    /// Remember the barrier-round clock this thread entered with
    pub fn set_barrier_slot(&self, round: RoundClock) {
        *self.barrier_slot.lock() = Some(round);
    }

    /// Take back the barrier-round clock stored at enter
    pub fn take_barrier_slot(&self) -> Option<RoundClock> {
        self.barrier_slot.lock().take()
    }

    fn mark_stopped(&self) {
        self.live.store(false, Ordering::Release);
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vector = self.vector.lock();
        write!(
            f,
            "[tid={:<2} C={} E={}]",
            self.tid.as_usize(),
            *vector,
            self.epoch()
        )
    }
}

/// All thread shadow state plus tid-recycling bookkeeping
pub struct ThreadRegistry {
    threads: DashMap<Tid, Arc<ThreadState>>,
    /// Highest epoch clock ever assigned per tid; its own monitor
    max_epoch_per_tid: Mutex<VectorClock>,
    max_tid: usize,
}

impl ThreadRegistry {
    /// Create an empty registry accepting tids below `max_tid`
    pub fn new(max_tid: usize) -> Self {
        Self {
            threads: DashMap::new(),
            max_epoch_per_tid: Mutex::new(VectorClock::with_capacity(max_tid.min(64))),
            max_tid,
        }
    }

    /// Register a new (or recycled) tid and initialize its clocks.
    ///
    /// The tid entry starts one past the stored high-water mark, then
    /// ticks once, so nothing the previous owner of this tid did can be
    /// confused with the new thread's work.
    pub fn register(&self, tid: Tid) -> EngineResult<Arc<ThreadState>> {
        if tid.as_usize() >= self.max_tid {
            return Err(EngineError::TidOutOfRange {
                tid,
                max_tid: self.max_tid,
            });
        }
        if let Some(existing) = self.threads.get(&tid) {
            if existing.is_live() {
                return Err(EngineError::ThreadAlreadyLive(tid));
            }
        }

        let state = {
            let watermark = self.max_epoch_per_tid.lock();
            let clock = watermark.get(tid) + 1;
            if clock > Epoch::MAX_CLOCK {
                return Err(EngineError::ClockOverflow { tid });
            }
            Arc::new(ThreadState::new(tid, clock))
        };
        state.tick()?;
        debug!(tid = tid.as_usize(), epoch = %state.epoch(), "thread registered");

        self.threads.insert(tid, state.clone());
        Ok(state)
    }

    /// Look up a registered thread (live or terminated-but-joinable)
    pub fn get(&self, tid: Tid) -> EngineResult<Arc<ThreadState>> {
        self.threads
            .get(&tid)
            .map(|entry| entry.clone())
            .ok_or(EngineError::UnknownThread(tid))
    }

    /// Record a thread's final epoch and mark it stopped.
    ///
    /// The state stays in the registry so a later join can still read its
    /// clock; a subsequent `register` of the same tid replaces it.
    pub fn stop(&self, tid: Tid) -> EngineResult<()> {
        let state = self.get(tid)?;
        {
            let mut watermark = self.max_epoch_per_tid.lock();
            let current = watermark.get(tid);
            let last = state.epoch().clock();
            if last > current {
                watermark.set(tid, last);
            }
        }
        state.mark_stopped();
        Ok(())
    }

    /// Stored high-water mark for `tid` (0 if never used)
    pub fn high_water_mark(&self, tid: Tid) -> u64 {
        self.max_epoch_per_tid.lock().get(tid)
    }

    /// Snapshot every registered thread for the exit dump
    pub fn snapshots(&self) -> Vec<String> {
        let mut dump: Vec<(usize, String)> = self
            .threads
            .iter()
            .map(|entry| (entry.key().as_usize(), entry.value().to_string()))
            .collect();
        dump.sort_by_key(|(tid, _)| *tid);
        dump.into_iter().map(|(_, line)| line).collect()
    }
}
