//! Synchronization-Event Handlers
//!
//! Clock transformations for everything that orders threads: monitors,
//! fork/join, wait, volatiles, barriers, and class initialization. The
//! shapes are the classic release/acquire pair:
//!
//! - release-like: fold the thread's vector into the object's clock, then
//!   tick the thread
//! - acquire-like: fold the object's clock into the thread's vector
//!
//! A thread only ever locks its own vector here, except at fork (the
//! child has not started) and join (the joinee has terminated), so no
//! two handlers can wait on each other's vector monitors.

use super::RaceDetector;
use crate::domain::counters::Outcome;
use crate::domain::shadow::ThreadState;
use racetrack_core::{BarrierId, ClassId, EngineError, EngineResult, LockId, Tid, VolatileId};

impl RaceDetector {
    /// `NewThread`: create the thread's shadow state (§ thread registry)
    pub(crate) fn on_new_thread(&self, tid: Tid) -> EngineResult<()> {
        self.threads().register(tid)?;
        Ok(())
    }

    /// `Acquire(lock)`: `V.max(lockClock); E = V[tid]`
    pub(crate) fn on_acquire(&self, tid: Tid, lock: LockId) -> EngineResult<()> {
        let thread = self.threads().get(tid)?;
        let state = self.sync().lock_state(lock);
        thread.max_with(&state.clock());
        self.count(Outcome::Acquire, tid);
        Ok(())
    }

    /// `Release(lock)`: `lockClock.max(V); V.tick(tid)`
    pub(crate) fn on_release(&self, tid: Tid, lock: LockId) -> EngineResult<()> {
        let thread = self.threads().get(tid)?;
        let state = self.sync().lock_state(lock);
        {
            let vector = thread.vector();
            state.clock().max_with(&vector);
        }
        thread.tick()?;
        self.count(Outcome::Release, tid);
        Ok(())
    }

    /// `Fork`: the child inherits the parent's history and both advance.
    ///
    /// Touching the child's vector from the parent is safe here: the
    /// runtime guarantees the forked thread synchronizes with its parent
    /// before doing anything else.
    pub(crate) fn on_fork(&self, parent: Tid, child: Tid) -> EngineResult<()> {
        let parent_state = self.threads().get(parent)?;
        let child_state = self.threads().get(child)?;
        {
            let parent_vector = parent_state.vector();
            child_state.max_and_tick(&parent_vector)?;
        }
        parent_state.tick()?;
        self.count(Outcome::Fork, parent);
        Ok(())
    }

    /// `Join`: the joiner absorbs the terminated joinee's history.
    ///
    /// No tick on the joinee — it has stopped and will not produce
    /// another epoch.
    pub(crate) fn on_join(&self, joiner: Tid, joinee: Tid) -> EngineResult<()> {
        let joiner_state = self.threads().get(joiner)?;
        let joinee_state = self.threads().get(joinee)?;
        {
            let joinee_vector = joinee_state.vector();
            joiner_state.max_with(&joinee_vector);
        }
        self.count(Outcome::Join, joiner);
        Ok(())
    }

    /// `Stop`: flush the thread's final epoch into the tid watermark
    pub(crate) fn on_stop(&self, tid: Tid) -> EngineResult<()> {
        self.threads().stop(tid)?;
        self.count(Outcome::Other, tid);
        Ok(())
    }

    /// `PreWait`: release-like on the monitor about to be given up
    pub(crate) fn on_pre_wait(&self, tid: Tid, lock: LockId) -> EngineResult<()> {
        let thread = self.threads().get(tid)?;
        let state = self.sync().lock_state(lock);
        {
            let vector = thread.vector();
            state.clock().max_with(&vector);
        }
        thread.tick()?;
        self.count(Outcome::Wait, tid);
        Ok(())
    }

    /// `PostWait`: acquire-like on the re-taken monitor
    pub(crate) fn on_post_wait(&self, tid: Tid, lock: LockId) -> EngineResult<()> {
        let thread = self.threads().get(tid)?;
        let state = self.sync().lock_state(lock);
        thread.max_with(&state.clock());
        self.count(Outcome::Wait, tid);
        Ok(())
    }

    /// Notify carries no ordering of its own; the surrounding monitor
    /// release/acquire already does
    pub(crate) fn on_notify(&self, tid: Tid) -> EngineResult<()> {
        self.threads().get(tid)?;
        self.count(Outcome::Other, tid);
        Ok(())
    }

    /// Volatile write is release-like, volatile read acquire-like
    pub(crate) fn on_volatile_access(
        &self,
        thread: &ThreadState,
        volatile: VolatileId,
        is_write: bool,
    ) -> EngineResult<()> {
        let state = self.sync().volatile_state(volatile);
        if is_write {
            {
                let vector = thread.vector();
                state.clock().max_with(&vector);
            }
            thread.tick()?;
        } else {
            thread.max_with(&state.clock());
        }
        self.count(Outcome::Volatile, thread.tid());
        Ok(())
    }

    /// `BarrierEnter`: fold into the round's accumulator and remember it
    pub(crate) fn on_barrier_enter(&self, tid: Tid, barrier: BarrierId) -> EngineResult<()> {
        let thread = self.threads().get(tid)?;
        let state = self.sync().barrier_state(barrier);
        let round = {
            let vector = thread.vector();
            state.enter(&vector)
        };
        thread.set_barrier_slot(round);
        self.count(Outcome::Barrier, tid);
        Ok(())
    }

    /// `BarrierExit`: absorb the round's accumulated clock and advance;
    /// the first exiter rotates the accumulator for the next round
    pub(crate) fn on_barrier_exit(&self, tid: Tid, barrier: BarrierId) -> EngineResult<()> {
        let thread = self.threads().get(tid)?;
        let round = thread
            .take_barrier_slot()
            .ok_or(EngineError::BarrierNotEntered(tid))?;
        let state = self.sync().barrier_state(barrier);
        state.retire(&round);
        {
            let accumulated = round.lock();
            thread.max_and_tick(&accumulated)?;
        }
        self.count(Outcome::Barrier, tid);
        Ok(())
    }

    /// `ClassInitialized`: publish the initializer's history on the class
    pub(crate) fn on_class_initialized(&self, tid: Tid, class: ClassId) -> EngineResult<()> {
        let thread = self.threads().get(tid)?;
        self.sync().class_init().with_clock(class, |clock| {
            let vector = thread.vector();
            clock.copy_from(&vector);
        });
        thread.tick()?;
        self.count(Outcome::Other, tid);
        Ok(())
    }

    /// `ClassAccessed`: first touch of a class's statics by this thread
    /// acquires the initialization history
    pub(crate) fn on_class_accessed(&self, tid: Tid, class: ClassId) -> EngineResult<()> {
        let thread = self.threads().get(tid)?;
        self.sync()
            .class_init()
            .with_clock(class, |clock| thread.max_with(clock));
        self.count(Outcome::Other, tid);
        Ok(())
    }
}
