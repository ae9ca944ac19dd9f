//! # Racetrack Core
//!
//! Shared vocabulary between the racetrack analysis engine and its
//! embedders (instrumentation agents, replay harnesses, report tooling).
//!
//! ## Module Organization
//!
//! - `ids`: copyable identity newtypes for threads, locks, volatiles,
//!   classes, barriers, and access sites
//! - `error`: fatal engine failure modes and the `EngineResult` alias
//! - `config`: detector options with serde support and a fluent builder
//!
//! Nothing here allocates per-event or takes a lock; the hot state all
//! lives in `racetrack-engine`.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod ids;

// Re-export commonly used types
pub use config::{DetectorConfig, DetectorConfigBuilder, SamplingScheme, MAX_TID_LIMIT};
pub use error::{EngineError, EngineResult};
pub use ids::{BarrierId, ClassId, LockId, SiteId, Tid, VolatileId};

/// Library version
pub const RACETRACK_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
