//! Criterion benchmarks for the per-frame region computations.
//!
//! Region integration is the work the single-flight processor keeps off the
//! interactive path; background commit rebuilds the displayed frame.
//!
//! Run with: cargo bench --bench region_integration

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use roi_core::{BackgroundSubtractor, Frame, Region, RegionShape};

fn frame(side: u32) -> Arc<Frame> {
    let pixels = (0..side * side).map(|i| (i % 4096) as u16).collect();
    Frame::from_u16(side, side, pixels).unwrap().into_shared()
}

fn integrate_by_shape(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_integrate");

    for side in [512u32, 1024, 2048] {
        let frame = frame(side);
        for shape in [RegionShape::Rectangle, RegionShape::Circle] {
            let region = Region::centered_in(shape, side, side, 400.0).unwrap();
            group.throughput(Throughput::Elements(400 * 400));
            group.bench_with_input(
                BenchmarkId::new(format!("{shape:?}"), side),
                &region,
                |b, region| b.iter(|| black_box(region.integrate(&frame))),
            );
        }
    }
    group.finish();
}

fn frame_total(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_total");
    for side in [512u32, 2048] {
        let frame = frame(side);
        group.throughput(Throughput::Elements(u64::from(side) * u64::from(side)));
        group.bench_function(BenchmarkId::from_parameter(side), |b| {
            b.iter(|| black_box(frame.total()))
        });
    }
    group.finish();
}

fn background_commit(c: &mut Criterion) {
    let frame = frame(2048);
    let region = Region::rectangle(1748.0, 1748.0, 300.0, 300.0).unwrap();
    c.bench_function("background_commit_2048", |b| {
        let mut subtractor = BackgroundSubtractor::new(Arc::clone(&frame));
        b.iter(|| black_box(subtractor.commit(&region).unwrap()))
    });
}

criterion_group!(benches, integrate_by_shape, frame_total, background_commit);
criterion_main!(benches);
