//! Access-Path Benchmark Suite
//!
//! Establishes a baseline for the per-access cost of the analysis:
//!
//! 1. **Same-epoch read/write** — the lock-free fast path that dominates
//!    real workloads
//! 2. **Exclusive read handover** — slow path with an ordered previous
//!    reader
//! 3. **Shared-mode read** — slow path updating the reader map
//! 4. **Sampling decision** — the gate in front of everything

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use racetrack_core::{ClassId, DetectorConfig, SamplingScheme, SiteId, Tid};
use racetrack_engine::{
    AccessEvent, AccessInfo, AccessTarget, Event, RaceDetector, ShadowSlot, SourceLocation,
};
use std::sync::Arc;

fn setup(
    rate: u32,
    scheme: SamplingScheme,
    seed_write: bool,
) -> (RaceDetector, Arc<AccessInfo>, ShadowSlot) {
    let config = DetectorConfig::builder()
        .sampling_rate(rate)
        .sampling_scheme(scheme)
        .build()
        .unwrap();
    let detector = RaceDetector::with_default_sink(config).unwrap();
    detector
        .dispatch(Event::NewThread { tid: Tid::new(0) })
        .unwrap();
    detector
        .dispatch(Event::NewThread { tid: Tid::new(1) })
        .unwrap();

    let target = AccessTarget::Field {
        owner: ClassId::new(1),
        name: "hot".into(),
        is_static: false,
    };
    let info = Arc::new(AccessInfo {
        site: SiteId::new(1),
        target: target.clone(),
        location: SourceLocation {
            method: "Bench.run".into(),
            line: 1,
        },
    });
    let shadow = detector
        .make_shadow_var(Tid::new(0), seed_write, &target)
        .unwrap();
    (detector, info, shadow)
}

fn access(tid: usize, is_write: bool, info: &Arc<AccessInfo>, shadow: &ShadowSlot) -> Event {
    Event::Access(AccessEvent {
        tid: Tid::new(tid),
        is_write,
        element: None,
        shadow: shadow.clone(),
        info: info.clone(),
    })
}

fn bench_same_epoch(c: &mut Criterion) {
    let (detector, info, shadow) = setup(100, SamplingScheme::Count, true);
    // Prime: one write and one read by t0 in its current epoch.
    detector
        .dispatch(access(0, true, &info, &shadow))
        .unwrap();
    detector
        .dispatch(access(0, false, &info, &shadow))
        .unwrap();

    c.bench_function("read_same_epoch", |b| {
        b.iter(|| {
            detector
                .dispatch(black_box(access(0, false, &info, &shadow)))
                .unwrap()
        })
    });
    c.bench_function("write_same_epoch", |b| {
        b.iter(|| {
            detector
                .dispatch(black_box(access(0, true, &info, &shadow)))
                .unwrap()
        })
    });
}

fn bench_exclusive_read_handover(c: &mut Criterion) {
    let (detector, info, shadow) = setup(100, SamplingScheme::Count, true);
    // Keep the two threads ordered through a lock so every handover runs
    // the exclusive-read slow path instead of reporting.
    let lock = racetrack_core::LockId::new(1);
    c.bench_function("read_exclusive_handover", |b| {
        let mut turn = 0usize;
        b.iter(|| {
            let tid = turn & 1;
            turn += 1;
            detector
                .dispatch(Event::Acquire {
                    tid: Tid::new(tid),
                    lock,
                })
                .unwrap();
            detector
                .dispatch(access(tid, false, &info, &shadow))
                .unwrap();
            detector
                .dispatch(Event::Release {
                    tid: Tid::new(tid),
                    lock,
                })
                .unwrap();
        })
    });
}

fn bench_shared_read(c: &mut Criterion) {
    // Seed with a read so the unordered second reader triggers the
    // shared transition without tripping a write-read race first.
    let (detector, info, shadow) = setup(100, SamplingScheme::Count, false);
    let lock = racetrack_core::LockId::new(1);
    detector
        .dispatch(access(1, false, &info, &shadow))
        .unwrap();

    c.bench_function("read_shared_update", |b| {
        let mut turn = 0usize;
        b.iter(|| {
            let tid = turn & 1;
            turn += 1;
            detector
                .dispatch(Event::Acquire {
                    tid: Tid::new(tid),
                    lock,
                })
                .unwrap();
            detector
                .dispatch(access(tid, false, &info, &shadow))
                .unwrap();
            detector
                .dispatch(Event::Release {
                    tid: Tid::new(tid),
                    lock,
                })
                .unwrap();
        })
    });
}

fn bench_sampling_gate(c: &mut Criterion) {
    let (detector, info, shadow) = setup(10, SamplingScheme::Adaptive, true);
    c.bench_function("adaptive_sampling_gate", |b| {
        b.iter(|| {
            detector
                .dispatch(black_box(access(0, false, &info, &shadow)))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_same_epoch,
    bench_exclusive_read_handover,
    bench_shared_read,
    bench_sampling_gate
);
criterion_main!(benches);
