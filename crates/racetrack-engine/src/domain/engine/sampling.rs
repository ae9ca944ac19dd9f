//! Sampling Controller
//!
//! Gates entry into the access rules. Two schemes:
//!
//! - **COUNT** — one process-global `sampled`/`not_sampled` pair; the
//!   inclusion test `sampled * (100 - rate) < not_sampled * rate` drives
//!   the empirical analyzed fraction toward `rate / 100` over the whole
//!   run.
//! - **ADAPTIVE** — the same test against each variable's local pair,
//!   with the local rate decaying by `exp(-1/100)` per evaluation toward
//!   a configured floor. Frequently observed locations fade, rarely
//!   observed ones keep their full rate.
//!
//! Both schemes keep both counter sets up to date so the exit summary can
//! state the realized fractions. Counter updates are relaxed atomics:
//! a lost increment only perturbs the sampled fraction, never the
//! analysis itself.

use crate::domain::shadow::VarState;
use racetrack_core::{DetectorConfig, SamplingScheme};
use std::sync::atomic::{AtomicU64, Ordering};

/// Decay applied to an adaptive location's rate per evaluation
fn exp_factor() -> f64 {
    (-1.0f64 / 100.0).exp()
}

/// The inclusion decision shared by both schemes
#[inline]
fn included(sampled: u64, not_sampled: u64, rate: f64) -> bool {
    (sampled as f64) * (100.0 - rate) < (not_sampled as f64) * rate
}

/// Per-detector sampling state
pub struct Sampler {
    scheme: SamplingScheme,
    rate: f64,
    decay: f64,
    sampled: AtomicU64,
    not_sampled: AtomicU64,
}

impl Sampler {
    /// Build a sampler from the detector configuration
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            scheme: config.sampling_scheme,
            rate: f64::from(config.sampling_rate),
            decay: exp_factor(),
            sampled: AtomicU64::new(1),
            not_sampled: AtomicU64::new(1),
        }
    }

    /// The scheme this sampler runs
    pub fn scheme(&self) -> SamplingScheme {
        self.scheme
    }

    /// Decide whether this access participates in analysis, updating the
    /// global and per-variable counters either way.
    pub fn should_analyze(&self, var: &VarState) -> bool {
        let verdict = match self.scheme {
            SamplingScheme::Count => included(
                self.sampled.load(Ordering::Relaxed),
                self.not_sampled.load(Ordering::Relaxed),
                self.rate,
            ),
            SamplingScheme::Adaptive => {
                let local = var.sampling();
                let verdict = included(
                    u64::from(local.sampled()),
                    u64::from(local.not_sampled()),
                    local.rate(),
                );
                local.decay(self.decay);
                verdict
            }
        };

        var.sampling().record(verdict);
        if verdict {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.not_sampled.fetch_add(1, Ordering::Relaxed);
        }
        verdict
    }

    /// Global `(sampled, not_sampled)` counts, including the initial 1s
    pub fn global_counts(&self) -> (u64, u64) {
        (
            self.sampled.load(Ordering::Relaxed),
            self.not_sampled.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::Epoch;
    use racetrack_core::Tid;

    fn var(rate: f64, floor: f64) -> VarState {
        VarState::new(true, Epoch::make(Tid::new(0), 1), rate, floor)
    }

    fn config(rate: u32, scheme: SamplingScheme) -> DetectorConfig {
        DetectorConfig::builder()
            .sampling_rate(rate)
            .sampling_scheme(scheme)
            .build()
            .unwrap()
    }

    #[test]
    fn rate_100_includes_everything() {
        let sampler = Sampler::new(&config(100, SamplingScheme::Count));
        let sx = var(100.0, 1.0);
        for _ in 0..100 {
            assert!(sampler.should_analyze(&sx));
        }
        let (sampled, not_sampled) = sampler.global_counts();
        assert_eq!(sampled, 101);
        assert_eq!(not_sampled, 1);
    }

    #[test]
    fn rate_0_excludes_everything() {
        let sampler = Sampler::new(&config(0, SamplingScheme::Count));
        let sx = var(0.0, 1.0);
        for _ in 0..100 {
            assert!(!sampler.should_analyze(&sx));
        }
    }

    #[test]
    fn count_scheme_converges_to_rate() {
        let sampler = Sampler::new(&config(25, SamplingScheme::Count));
        let sx = var(25.0, 1.0);
        let mut hits = 0u64;
        let n = 10_000;
        for _ in 0..n {
            if sampler.should_analyze(&sx) {
                hits += 1;
            }
        }
        let fraction = hits as f64 / n as f64;
        assert!(
            (fraction - 0.25).abs() < 0.01,
            "fraction {} far from 0.25",
            fraction
        );
    }

    #[test]
    fn count_scheme_is_deterministic() {
        let run = || {
            let sampler = Sampler::new(&config(50, SamplingScheme::Count));
            let sx = var(50.0, 1.0);
            (0..64)
                .map(|_| sampler.should_analyze(&sx))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn adaptive_rate_decays_per_evaluation() {
        let sampler = Sampler::new(&config(80, SamplingScheme::Adaptive));
        let sx = var(80.0, 5.0);
        let before = sx.sampling().rate();
        sampler.should_analyze(&sx);
        let after = sx.sampling().rate();
        assert!(after < before);

        for _ in 0..10_000 {
            sampler.should_analyze(&sx);
        }
        assert!((sx.sampling().rate() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn adaptive_uses_local_counters() {
        let sampler = Sampler::new(&config(100, SamplingScheme::Adaptive));
        let hot = var(100.0, 1.0);
        let cold = var(100.0, 1.0);

        for _ in 0..5_000 {
            sampler.should_analyze(&hot);
        }
        // A cold location still has its full local rate even though the
        // hot one has decayed to its floor.
        assert!(hot.sampling().rate() < 2.0);
        assert!(sampler.should_analyze(&cold));
    }
}
