//! Per-Variable Shadow State
//!
//! One [`VarState`] is attached to every instrumented memory location
//! (field or array element). It records the last write epoch `W`, the last
//! read epoch `R` (or the shared sentinel), and — once reads have gone
//! shared — a per-reader epoch map.
//!
//! # Synchronization
//!
//! `W` and `R` live in atomic words so the lock-free fast path may observe
//! them. The fast path only ever *reads* with `Relaxed` ordering; if the
//! observed value equals the thread's current epoch no mutation is needed
//! and the short-circuit is sound regardless of staleness. Every mutation,
//! and every authoritative re-read, happens under [`VarState::monitor`]
//! with `Acquire`/`Release` ordering.
//!
//! The shared-read map is created at most once per variable (reads never
//! transition back from shared to exclusive) so it sits in a `OnceCell`
//! sized for the configured tid bound; its entries are atomics because a
//! thread's fast path reads its own entry without the monitor.
//!
//! Sampling counters are deliberately outside the monitor: they tolerate
//! lost increments, which only perturb the empirical sampled fraction.

use crate::domain::clock::{Epoch, VectorClock};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};
use racetrack_core::Tid;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Fixed-size map from reader tid to the epoch of that reader's last read.
///
/// Allocated on the read-share transition with one slot per possible tid,
/// so it is never resized and unsynchronized same-entry reads stay defined.
pub struct ReadMap {
    slots: Box<[AtomicU64]>,
}

impl ReadMap {
    /// Create a map with `max_tid` zeroed slots
    pub fn new(max_tid: usize) -> Self {
        let slots = (0..max_tid).map(|_| AtomicU64::new(0)).collect();
        Self { slots }
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the map has no slots
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Last-read epoch recorded for `tid` ([`Epoch::ZERO`] if none)
    #[inline]
    pub fn get(&self, tid: Tid) -> Epoch {
        match self.slots.get(tid.as_usize()) {
            Some(slot) => Epoch::from_raw(slot.load(Ordering::Relaxed)),
            None => Epoch::ZERO,
        }
    }

    /// Record `epoch` as `tid`'s last read; callers hold the monitor
    #[inline]
    pub fn set(&self, tid: Tid, epoch: Epoch) {
        self.slots[tid.as_usize()].store(epoch.raw(), Ordering::Relaxed);
    }

    /// Does any recorded read epoch exceed what `other` has observed?
    pub fn any_gt(&self, other: &VectorClock) -> bool {
        self.slots.iter().enumerate().any(|(idx, slot)| {
            Epoch::from_raw(slot.load(Ordering::Relaxed)).clock() > other.get(Tid::new(idx))
        })
    }

    /// Smallest tid at or after `start` whose read epoch exceeds what
    /// `other` has observed. Ascending enumeration via `start = prev + 1`
    /// visits each racing reader exactly once.
    pub fn next_gt(&self, other: &VectorClock, start: usize) -> Option<Tid> {
        (start..self.slots.len())
            .find(|&idx| {
                Epoch::from_raw(self.slots[idx].load(Ordering::Relaxed)).clock()
                    > other.get(Tid::new(idx))
            })
            .map(Tid::new)
    }
}

impl fmt::Display for ReadMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for slot in self.slots.iter() {
            let epoch = Epoch::from_raw(slot.load(Ordering::Relaxed));
            if epoch == Epoch::ZERO {
                continue;
            }
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}", epoch)?;
        }
        write!(f, "]")
    }
}

/// Per-variable adaptive sampling counters
///
/// `sampled` and `not_sampled` start at 1 so the inclusion ratio is
/// defined from the first access. The local rate decays toward `floor`
/// each time the variable is evaluated.
pub struct SampleState {
    sampled: AtomicU32,
    not_sampled: AtomicU32,
    rate_bits: AtomicU64,
    floor: f64,
}

impl SampleState {
    fn new(rate: f64, floor: f64) -> Self {
        Self {
            sampled: AtomicU32::new(1),
            not_sampled: AtomicU32::new(1),
            rate_bits: AtomicU64::new(rate.to_bits()),
            floor,
        }
    }

    /// Current local inclusion rate in percent
    #[inline]
    pub fn rate(&self) -> f64 {
        f64::from_bits(self.rate_bits.load(Ordering::Relaxed))
    }

    /// Counter of analyzed accesses to this variable
    #[inline]
    pub fn sampled(&self) -> u32 {
        self.sampled.load(Ordering::Relaxed)
    }

    /// Counter of skipped accesses to this variable
    #[inline]
    pub fn not_sampled(&self) -> u32 {
        self.not_sampled.load(Ordering::Relaxed)
    }

    /// Decay the local rate by `factor`, clamped at the floor
    #[inline]
    pub fn decay(&self, factor: f64) {
        let next = (self.rate() * factor).max(self.floor);
        self.rate_bits.store(next.to_bits(), Ordering::Relaxed);
    }

    /// Bump the counter matching this access's inclusion decision
    #[inline]
    pub fn record(&self, included: bool) {
        if included {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.not_sampled.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Shadow state for one memory location
pub struct VarState {
    /// Epoch of the last write
    w: AtomicU64,
    /// Epoch of the last read, or [`Epoch::READ_SHARED`]
    r: AtomicU64,
    /// Per-reader epochs; populated on the read-share transition
    read_map: OnceCell<ReadMap>,
    /// The per-variable monitor serializing slow-path rule evaluation
    monitor: Mutex<()>,
    /// Adaptive sampling counters
    sampling: SampleState,
}

impl VarState {
    /// Shadow a location first touched at `epoch`; a creating write seeds
    /// `W`, a creating read seeds `R`.
    pub fn new(is_write: bool, epoch: Epoch, rate: f64, floor: f64) -> Self {
        let (w, r) = if is_write {
            (epoch, Epoch::ZERO)
        } else {
            (Epoch::ZERO, epoch)
        };
        Self {
            w: AtomicU64::new(w.raw()),
            r: AtomicU64::new(r.raw()),
            read_map: OnceCell::new(),
            monitor: Mutex::new(()),
            sampling: SampleState::new(rate, floor),
        }
    }

    /// Enter this variable's monitor (the slow path)
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.monitor.lock()
    }

    /// Unsynchronized observation of `R` for the fast path
    #[inline]
    pub fn read_epoch_relaxed(&self) -> Epoch {
        Epoch::from_raw(self.r.load(Ordering::Relaxed))
    }

    /// Unsynchronized observation of `W` for the fast path
    #[inline]
    pub fn write_epoch_relaxed(&self) -> Epoch {
        Epoch::from_raw(self.w.load(Ordering::Relaxed))
    }

    /// Authoritative read of `R`; callers hold the monitor
    #[inline]
    pub fn read_epoch(&self) -> Epoch {
        Epoch::from_raw(self.r.load(Ordering::Acquire))
    }

    /// Authoritative read of `W`; callers hold the monitor
    #[inline]
    pub fn write_epoch(&self) -> Epoch {
        Epoch::from_raw(self.w.load(Ordering::Acquire))
    }

    /// Update `R`; callers hold the monitor
    #[inline]
    pub fn set_read_epoch(&self, epoch: Epoch) {
        self.r.store(epoch.raw(), Ordering::Release);
    }

    /// Update `W`; callers hold the monitor
    #[inline]
    pub fn set_write_epoch(&self, epoch: Epoch) {
        self.w.store(epoch.raw(), Ordering::Release);
    }

    /// The shared-read map, if this variable has gone shared
    #[inline]
    pub fn read_map(&self) -> Option<&ReadMap> {
        self.read_map.get()
    }

    /// The shared-read map, creating it with `max_tid` slots on the
    /// read-share transition; callers hold the monitor
    pub fn read_map_or_init(&self, max_tid: usize) -> &ReadMap {
        self.read_map.get_or_init(|| ReadMap::new(max_tid))
    }

    /// This variable's sampling counters
    #[inline]
    pub fn sampling(&self) -> &SampleState {
        &self.sampling
    }
}

impl fmt::Debug for VarState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarState{}", self)
    }
}

impl fmt::Display for VarState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.read_epoch_relaxed();
        write!(f, "[W={}", self.write_epoch_relaxed())?;
        write!(f, " R={}", r)?;
        if let Some(map) = self.read_map() {
            if r.is_read_shared() {
                write!(f, " CV={}", map)?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racetrack_core::Tid;

    fn epoch(tid: usize, clock: u64) -> Epoch {
        Epoch::make(Tid::new(tid), clock)
    }

    #[test]
    fn creating_write_seeds_w_only() {
        let sx = VarState::new(true, epoch(1, 5), 100.0, 1.0);
        assert_eq!(sx.write_epoch(), epoch(1, 5));
        assert_eq!(sx.read_epoch(), Epoch::ZERO);
    }

    #[test]
    fn creating_read_seeds_r_only() {
        let sx = VarState::new(false, epoch(2, 3), 100.0, 1.0);
        assert_eq!(sx.write_epoch(), Epoch::ZERO);
        assert_eq!(sx.read_epoch(), epoch(2, 3));
    }

    #[test]
    fn read_map_initialized_once() {
        let sx = VarState::new(false, epoch(0, 1), 100.0, 1.0);
        assert!(sx.read_map().is_none());

        let map = sx.read_map_or_init(8);
        assert_eq!(map.len(), 8);
        assert!(!map.is_empty());
        map.set(Tid::new(3), epoch(3, 2));
        // Second init request returns the same map.
        let again = sx.read_map_or_init(8);
        assert_eq!(again.get(Tid::new(3)), epoch(3, 2));
    }

    #[test]
    fn read_map_gt_scans_by_clock() {
        let map = ReadMap::new(4);
        map.set(Tid::new(0), epoch(0, 2));
        map.set(Tid::new(2), epoch(2, 4));

        let mut seen = VectorClock::new();
        seen.set(Tid::new(0), 2);
        seen.set(Tid::new(2), 3);

        assert!(map.any_gt(&seen));
        assert_eq!(map.next_gt(&seen, 0), Some(Tid::new(2)));
        assert_eq!(map.next_gt(&seen, 3), None);

        seen.set(Tid::new(2), 4);
        assert!(!map.any_gt(&seen));
    }

    #[test]
    fn read_map_enumerates_every_racing_reader_once() {
        let map = ReadMap::new(5);
        map.set(Tid::new(1), epoch(1, 1));
        map.set(Tid::new(4), epoch(4, 7));

        let empty = VectorClock::new();
        let mut hits = Vec::new();
        let mut start = 0;
        while let Some(tid) = map.next_gt(&empty, start) {
            hits.push(tid.as_usize());
            start = tid.as_usize() + 1;
        }
        assert_eq!(hits, vec![1, 4]);
    }

    #[test]
    fn sampling_rate_decays_to_floor() {
        let sx = VarState::new(true, epoch(0, 1), 50.0, 10.0);
        let factor = (-1.0f64 / 100.0).exp();
        for _ in 0..1000 {
            sx.sampling().decay(factor);
        }
        assert!((sx.sampling().rate() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn sampling_counters_start_at_one() {
        let sx = VarState::new(true, epoch(0, 1), 100.0, 1.0);
        assert_eq!(sx.sampling().sampled(), 1);
        assert_eq!(sx.sampling().not_sampled(), 1);
        sx.sampling().record(true);
        sx.sampling().record(false);
        assert_eq!(sx.sampling().sampled(), 2);
        assert_eq!(sx.sampling().not_sampled(), 2);
    }

    #[test]
    fn display_shows_shared_map() {
        let sx = VarState::new(false, epoch(0, 1), 100.0, 1.0);
        let map = sx.read_map_or_init(4);
        map.set(Tid::new(0), epoch(0, 1));
        map.set(Tid::new(1), epoch(1, 2));
        sx.set_read_epoch(Epoch::READ_SHARED);

        let dump = sx.to_string();
        assert!(dump.contains("R=SHARED"));
        assert!(dump.contains("t1@2"));
    }
}
