use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geogrid::{ClusteringIndex, CountIndex, GeoPoint, Meters, PointsIndex, SnapshotIndex};

// Deterministic pseudo-random points around central London.
fn london_points(n: usize) -> Vec<GeoPoint> {
    let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        (seed >> 11) as f64 / (1u64 << 53) as f64
    };

    (0..n)
        .map(|i| {
            let lat = 51.3 + next() * 0.4;
            let lon = -0.5 + next() * 0.7;
            GeoPoint::new(format!("p{i}"), lat, lon)
        })
        .collect()
}

fn benchmark_points_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("points_index");
    let points = london_points(50_000);

    group.bench_function("add_50k", |b| {
        b.iter(|| {
            let mut index = PointsIndex::new(Meters::km(0.5));
            for point in &points {
                index.add(point.clone());
            }
            black_box(index.len())
        })
    });

    let mut index = PointsIndex::new(Meters::km(0.5));
    for point in &points {
        index.add(point.clone());
    }
    let center = GeoPoint::at(51.511291, -0.128242);

    for k in [1usize, 5, 50] {
        group.bench_with_input(BenchmarkId::new("k_nearest", k), &k, |b, &k| {
            b.iter(|| index.k_nearest(black_box(&center), k, Meters::km(5.0), |_| true).len())
        });
    }

    group.bench_function("points_within_1km", |b| {
        b.iter(|| index.points_within(black_box(&center), Meters::km(1.0), |_| true).len())
    });

    group.bench_function("range_2km", |b| {
        let top_left = GeoPoint::at(51.52, -0.14);
        let bottom_right = GeoPoint::at(51.50, -0.11);
        b.iter(|| index.range(black_box(&top_left), black_box(&bottom_right)).len())
    });

    group.bench_function("clone", |b| b.iter(|| black_box(index.clone()).len()));

    group.finish();
}

fn benchmark_count_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_index");
    let points = london_points(50_000);

    let mut index = CountIndex::new(Meters::km(10.0));
    for point in &points {
        index.add(point.clone());
    }

    group.bench_function("range_city", |b| {
        let top_left = GeoPoint::at(51.8, -0.6);
        let bottom_right = GeoPoint::at(51.2, 0.3);
        b.iter(|| index.range(black_box(&top_left), black_box(&bottom_right)).len())
    });

    group.finish();
}

fn benchmark_snapshot_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [1_000usize, 10_000] {
        let mut index = ClusteringIndex::new();
        for point in london_points(size) {
            index.add(point);
        }
        let shared = SnapshotIndex::new(index);

        group.bench_with_input(BenchmarkId::new("update", size), &size, |b, _| {
            let mut i = 0u64;
            b.iter(|| {
                i += 1;
                let lon = -0.1 + (i % 100) as f64 * 0.001;
                shared.update(|index| index.add(GeoPoint::new("moving", 51.5, lon)))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_points_index,
    benchmark_count_index,
    benchmark_snapshot_updates
);
criterion_main!(benches);
