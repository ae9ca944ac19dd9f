//! # Racetrack Engine
//!
//! A dynamic data-race detector core implementing the FastTrack analysis
//! (Flanagan & Freund, PLDI 2009) with an adaptive sampling front end.
//! The engine consumes a typed event stream — memory accesses, monitor
//! operations, fork/join, volatiles, barriers, waits, class
//! initialization — produced by an instrumentation collaborator, and
//! reports happens-before violations to a pluggable sink.
//!
//! # Shadow State
//!
//! - per thread: vector clock `V` and current epoch `E`, `E == V[tid]`
//! - per memory location: last-write epoch `W`, last-read epoch `R` (or a
//!   shared sentinel plus a per-reader epoch map)
//! - per lock / volatile / class / barrier: one vector clock
//!
//! Most accesses resolve on a lock-free fast path comparing one packed
//! epoch word; the slow path runs under a per-variable monitor. The
//! engine runs inline in the observed threads and is internally
//! consistent under full preemption.
//!
//! # Example
//!
//! ```
//! use racetrack_core::{DetectorConfig, SiteId, ClassId, Tid};
//! use racetrack_engine::{
//!     AccessEvent, AccessInfo, AccessTarget, Event, RaceDetector, SourceLocation,
//! };
//! use std::sync::Arc;
//!
//! let detector = RaceDetector::with_default_sink(DetectorConfig::default()).unwrap();
//! detector.dispatch(Event::NewThread { tid: Tid::new(0) }).unwrap();
//!
//! // The instrumentation asks for a shadow on first touch...
//! let info = Arc::new(AccessInfo {
//!     site: SiteId::new(1),
//!     target: AccessTarget::Field {
//!         owner: ClassId::new(1),
//!         name: "x".into(),
//!         is_static: false,
//!     },
//!     location: SourceLocation { method: "Demo.run".into(), line: 3 },
//! });
//! let shadow = detector
//!     .make_shadow_var(Tid::new(0), true, &info.target)
//!     .unwrap();
//!
//! // ...then streams accesses through it.
//! detector
//!     .dispatch(Event::Access(AccessEvent {
//!         tid: Tid::new(0),
//!         is_write: true,
//!         element: None,
//!         shadow,
//!         info,
//!     }))
//!     .unwrap();
//! ```

#![warn(missing_docs)]

pub mod domain;

pub use domain::{
    AccessEvent, AccessInfo, AccessTarget, CollectingSink, CounterRegistry, CounterSummary,
    Epoch, Event, Outcome, RaceDetector, RaceKind, RaceReport, ReadMap, ReportSink, Sampler,
    ShadowSlot, SinkDirective, SourceLocation, SyncTables, ThreadRegistry, ThreadState,
    TracingSink, VarState, VectorClock,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
