//! The Detection Engine
//!
//! [`RaceDetector`] is the context object owning every piece of global
//! state: the thread registry, the sync-object tables, the sampling
//! controller, the outcome counters, and the report sink. It has no
//! ambient statics — embedders may run several detectors side by side.
//!
//! The engine runs inline in the observed threads: each event handler
//! executes on the thread that caused the event, takes `&self`, and
//! relies on the per-object monitors described in the `shadow` module.
//! No handler blocks on anything but those monitors.

mod handlers;
mod rules;
pub mod sampling;

pub use sampling::Sampler;

use crate::domain::clock::{Epoch, VectorClock};
use crate::domain::counters::{CounterRegistry, CounterSummary, Outcome};
use crate::domain::event::{AccessEvent, AccessTarget, Event, ShadowSlot};
use crate::domain::report::{RaceKind, RaceReport, ReportSink, SinkDirective, TracingSink};
use crate::domain::shadow::{SyncTables, ThreadRegistry, ThreadState, VarState};
use dashmap::DashMap;
use racetrack_core::{DetectorConfig, EngineError, EngineResult, SiteId, Tid};
use std::sync::Arc;
use tracing::info;

/// The race detection engine
pub struct RaceDetector {
    config: DetectorConfig,
    threads: ThreadRegistry,
    sync: SyncTables,
    sampler: Sampler,
    counters: CounterRegistry,
    sink: Box<dyn ReportSink>,
    /// Sites the sink has advanced past; no further reports are built
    advanced: DashMap<SiteId, ()>,
}

impl RaceDetector {
    /// Create an engine delivering reports to `sink`
    pub fn new(config: DetectorConfig, sink: Box<dyn ReportSink>) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            threads: ThreadRegistry::new(config.max_tid),
            sync: SyncTables::new(),
            sampler: Sampler::new(&config),
            counters: CounterRegistry::new(config.max_tid),
            sink,
            advanced: DashMap::new(),
            config,
        })
    }

    /// Create an engine logging reports through `tracing`, one per site
    pub fn with_default_sink(config: DetectorConfig) -> EngineResult<Self> {
        Self::new(config, Box::new(TracingSink::default()))
    }

    /// The configuration this engine runs with
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Outcome counters for observability
    pub fn counters(&self) -> &CounterRegistry {
        &self.counters
    }

    /// The sampling controller's state
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Shadow state for a registered thread
    pub fn thread(&self, tid: Tid) -> EngineResult<Arc<ThreadState>> {
        self.threads.get(tid)
    }

    /// Handle one event from the instrumentation stream
    pub fn dispatch(&self, event: Event) -> EngineResult<()> {
        match event {
            Event::NewThread { tid } => self.on_new_thread(tid),
            Event::Fork { parent, child } => self.on_fork(parent, child),
            Event::Join { joiner, joinee } => self.on_join(joiner, joinee),
            Event::Stop { tid } => self.on_stop(tid),
            Event::Access(access) => self.access(&access),
            Event::Acquire { tid, lock } => self.on_acquire(tid, lock),
            Event::Release { tid, lock } => self.on_release(tid, lock),
            Event::PreWait { tid, lock } => self.on_pre_wait(tid, lock),
            Event::PostWait { tid, lock } => self.on_post_wait(tid, lock),
            Event::PreNotify { tid, .. } | Event::PostNotify { tid, .. } => self.on_notify(tid),
            Event::BarrierEnter { tid, barrier } => self.on_barrier_enter(tid, barrier),
            Event::BarrierExit { tid, barrier } => self.on_barrier_exit(tid, barrier),
            Event::ClassInitialized { tid, class } => self.on_class_initialized(tid, class),
            Event::ClassAccessed { tid, class } => self.on_class_accessed(tid, class),
        }
    }

    /// Shadow factory: called by the instrumentation the first time it
    /// encounters a memory location.
    ///
    /// Volatiles get no `VarState`; their clock is folded with the
    /// creating thread's vector instead. Data locations are seeded with
    /// the creator's epoch in `W` (creating write) or `R` (creating
    /// read).
    pub fn make_shadow_var(
        &self,
        tid: Tid,
        is_write: bool,
        target: &AccessTarget,
    ) -> EngineResult<ShadowSlot> {
        let thread = self.threads.get(tid)?;
        match target {
            AccessTarget::Volatile { id } => {
                let state = self.sync.volatile_state(*id);
                let vector = thread.vector();
                state.clock().max_with(&vector);
                Ok(ShadowSlot::Volatile)
            }
            AccessTarget::Field { .. } | AccessTarget::Array { .. } => {
                Ok(ShadowSlot::Data(Arc::new(VarState::new(
                    is_write,
                    thread.epoch(),
                    f64::from(self.config.sampling_rate),
                    self.config.adaptive_floor,
                ))))
            }
        }
    }

    /// Route one access through sampling and the matching rule
    fn access(&self, access: &AccessEvent) -> EngineResult<()> {
        let thread = self.threads.get(access.tid)?;
        match (&access.shadow, &access.info.target) {
            (ShadowSlot::Volatile, AccessTarget::Volatile { id }) => {
                self.on_volatile_access(&thread, *id, access.is_write)
            }
            (ShadowSlot::Data(_), AccessTarget::Volatile { .. })
            | (ShadowSlot::Volatile, AccessTarget::Field { .. })
            | (ShadowSlot::Volatile, AccessTarget::Array { .. }) => {
                Err(EngineError::MismatchedShadow(access.tid))
            }
            (ShadowSlot::Data(sx), target) => {
                if !self.sampler.should_analyze(sx) {
                    return Ok(());
                }
                // Static fields order against the owning class's
                // initialization before the access rule runs.
                if let AccessTarget::Field {
                    owner,
                    is_static: true,
                    ..
                } = target
                {
                    self.sync
                        .class_init()
                        .with_clock(*owner, |clock| thread.max_with(clock));
                }
                if access.is_write {
                    self.write_rule(&thread, sx, access)
                } else {
                    self.read_rule(&thread, sx, access)
                }
            }
        }
    }

    /// Build and deliver one race report, honoring advanced sites.
    ///
    /// Called from the rules with the variable's monitor held; the
    /// caller passes its already-locked vector so no thread snapshot can
    /// re-enter the vector's monitor.
    pub(crate) fn report_race(
        &self,
        kind: RaceKind,
        prev_op_tid: Tid,
        cur_op_tid: Tid,
        sx: &VarState,
        vector: &VectorClock,
        epoch: Epoch,
        access: &AccessEvent,
    ) {
        debug_assert_ne!(prev_op_tid, cur_op_tid);
        let site = access.info.site;
        if self.advanced.contains_key(&site) {
            return;
        }
        let report = RaceReport {
            kind,
            description: access.info.describe(access.element),
            prev_op_tid,
            cur_op_tid,
            shadow_state: sx.to_string(),
            thread_dump: format!(
                "[tid={:<2} C={} E={}]",
                cur_op_tid.as_usize(),
                vector,
                epoch
            ),
            site,
            location: access.info.location.clone(),
            stack: std::backtrace::Backtrace::capture().to_string(),
        };
        if self.sink.report(&report) == SinkDirective::Advance {
            self.advanced.insert(site, ());
        }
    }

    /// Aggregate counter totals at this point of the run
    pub fn summary(&self) -> CounterSummary {
        self.counters.summary()
    }

    /// Log the end-of-run picture: counters, sampling totals, and a
    /// snapshot of every thread's clocks
    pub fn log_summary(&self) {
        let summary = self.summary();
        for line in summary.to_string().lines() {
            info!("{}", line);
        }
        let (sampled, not_sampled) = self.sampler.global_counts();
        info!(sampled, not_sampled, "sampling totals");
        for snapshot in self.threads.snapshots() {
            info!("thread {}", snapshot);
        }
    }

    pub(crate) fn threads(&self) -> &ThreadRegistry {
        &self.threads
    }

    pub(crate) fn sync(&self) -> &SyncTables {
        &self.sync
    }

    pub(crate) fn count(&self, outcome: Outcome, tid: Tid) {
        self.counters.inc(outcome, tid);
    }

    pub(crate) fn max_tid(&self) -> usize {
        self.config.max_tid
    }
}
