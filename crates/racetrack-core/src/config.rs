//! Detector Configuration
//!
//! Options consumed by the analysis engine. Parsing a command line or a
//! config file into this struct is the embedder's job; the struct itself
//! is serde-friendly so harnesses can ship configurations as JSON.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Upper bound on `max_tid`: the epoch layout reserves 16 bits for tids.
pub const MAX_TID_LIMIT: usize = 1 << 16;

/// Which sampling controller gates the access rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SamplingScheme {
    /// One process-global counter pair; empirical sampled fraction
    /// converges to `sampling_rate / 100` across all locations.
    Count,
    /// Per-location counter pairs with an exponentially decaying local
    /// rate, floored at `adaptive_floor`. Hot locations are progressively
    /// de-prioritized, cold ones keep their full rate.
    Adaptive,
}

/// Configuration for one detector instance
///
/// # Examples
///
/// ```
/// use racetrack_core::{DetectorConfig, SamplingScheme};
///
/// let config = DetectorConfig::builder()
///     .sampling_rate(50)
///     .sampling_scheme(SamplingScheme::Adaptive)
///     .max_tid(128)
///     .build()
///     .unwrap();
/// assert_eq!(config.sampling_rate, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Inclusion percentage in 0..=100; 100 analyzes every access
    pub sampling_rate: u32,

    /// Global or per-location sampling
    pub sampling_scheme: SamplingScheme,

    /// Exclusive upper bound on tids; sizes per-tid counters and the
    /// shared-read maps
    pub max_tid: usize,

    /// Floor (in percent) that an adaptive location's rate decays toward;
    /// ignored under [`SamplingScheme::Count`]
    pub adaptive_floor: f64,
}

impl DetectorConfig {
    /// Start building a configuration from the defaults
    pub fn builder() -> DetectorConfigBuilder {
        DetectorConfigBuilder::new()
    }

    /// Check all field ranges
    pub fn validate(&self) -> EngineResult<()> {
        if self.sampling_rate > 100 {
            return Err(EngineError::InvalidSamplingRate(self.sampling_rate));
        }
        if self.max_tid == 0 || self.max_tid > MAX_TID_LIMIT {
            return Err(EngineError::InvalidMaxTid(self.max_tid));
        }
        if !(self.adaptive_floor > 0.0 && self.adaptive_floor <= 100.0) {
            return Err(EngineError::InvalidAdaptiveFloor(self.adaptive_floor));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 100,
            sampling_scheme: SamplingScheme::Count,
            max_tid: 64,
            adaptive_floor: 1.0,
        }
    }
}

/// Fluent builder for [`DetectorConfig`]
pub struct DetectorConfigBuilder {
    config: DetectorConfig,
}

impl DetectorConfigBuilder {
    /// Create a builder seeded with [`DetectorConfig::default`]
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
        }
    }

    /// Set the inclusion percentage (0..=100)
    pub fn sampling_rate(mut self, rate: u32) -> Self {
        self.config.sampling_rate = rate;
        self
    }

    /// Select the sampling controller
    pub fn sampling_scheme(mut self, scheme: SamplingScheme) -> Self {
        self.config.sampling_scheme = scheme;
        self
    }

    /// Set the exclusive tid bound
    pub fn max_tid(mut self, max_tid: usize) -> Self {
        self.config.max_tid = max_tid;
        self
    }

    /// Set the adaptive rate floor in percent
    pub fn adaptive_floor(mut self, floor: f64) -> Self {
        self.config.adaptive_floor = floor;
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> EngineResult<DetectorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for DetectorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
