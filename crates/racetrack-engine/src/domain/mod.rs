//! Domain Layer
//!
//! The analysis core, leaves first:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Domain Layer                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  clock                         shadow                       │
//! │  ├─ Epoch (packed word)        ├─ VarState  (per location)  │
//! │  └─ VectorClock                ├─ ThreadState / Registry    │
//! │                                └─ SyncTables (locks, vols,  │
//! │                                    barriers, class init)    │
//! │                                                             │
//! │  engine                        boundaries                   │
//! │  ├─ RaceDetector (context)     ├─ event   (input stream)    │
//! │  ├─ access rules               ├─ report  (sink trait)      │
//! │  ├─ sync handlers              └─ counters (observability)  │
//! │  └─ Sampler                                                 │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod counters;
pub mod engine;
pub mod event;
pub mod report;
pub mod shadow;

// Re-export the working set
pub use clock::{Epoch, VectorClock};
pub use counters::{CounterRegistry, CounterSummary, Outcome};
pub use engine::{RaceDetector, Sampler};
pub use event::{AccessEvent, AccessInfo, AccessTarget, Event, ShadowSlot, SourceLocation};
pub use report::{
    CollectingSink, RaceKind, RaceReport, ReportSink, SinkDirective, TracingSink,
};
pub use shadow::{ReadMap, SyncTables, ThreadRegistry, ThreadState, VarState};
