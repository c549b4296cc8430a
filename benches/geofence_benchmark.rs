use beacon_tracker::models::{Fence, LocationData};
use beacon_tracker::services::geofence;
use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::BTreeSet;
use std::hint::black_box;

/// Grid of `n` fences around central Moscow, ~1 km apart.
fn fence_grid(n: usize) -> Vec<Fence> {
    let side = (n as f64).sqrt().ceil() as usize;
    (0..n)
        .map(|i| Fence {
            id: i as i64,
            name: format!("Fence {}", i),
            latitude: 55.70 + (i / side) as f64 * 0.009,
            longitude: 37.55 + (i % side) as f64 * 0.016,
            radius: 300.0,
        })
        .collect()
}

fn benchmark_fence_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("fence_diff");

    for n in [10, 100, 1000] {
        let fences = fence_grid(n);
        let inside = LocationData::new(fences[0].latitude, fences[0].longitude, 10.0);
        let previous = BTreeSet::from([0, 1]);
        let far_away = LocationData::new(59.93, 30.31, 10.0);

        group.bench_function(format!("inside_{}_fences", n), |b| {
            b.iter(|| geofence::diff(black_box(&inside), black_box(&previous), &fences))
        });

        group.bench_function(format!("outside_{}_fences", n), |b| {
            b.iter(|| geofence::diff(black_box(&far_away), black_box(&previous), &fences))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_fence_diff);
criterion_main!(benches);
