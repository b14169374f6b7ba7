use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use galshell_logic::arms::{parametric_arms, reid_2014_arms};
use galshell_logic::membership::{ArmClassifier, AzimuthWindow};
use galshell_logic::shell::{sample_parallel, ShellGeometry};

fn reference_shell() -> ShellGeometry {
    ShellGeometry::from_light_years(20366.0, 20374.0, 8122.0)
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let points = sample_parallel(&reference_shell(), 10_000, 42, 1024).unwrap();
    let arms = parametric_arms(4, 8122.0, 12f64.to_radians());

    for steps in [31usize, 121, 481] {
        let classifier = ArmClassifier::new(&arms, AzimuthWindow::from_degrees(6.0, steps), 300.0).unwrap();
        group.bench_with_input(BenchmarkId::new("grid_steps", steps), &points, |b, points| {
            b.iter(|| classifier.classify(black_box(points)));
        });
    }

    group.finish();
}

fn bench_min_separation(c: &mut Criterion) {
    let mut group = c.benchmark_group("min_separation");
    let points = sample_parallel(&reference_shell(), 1_000, 7, 1024).unwrap();
    let classifier = ArmClassifier::new(&reid_2014_arms(), AzimuthWindow::default(), 300.0).unwrap();

    group.bench_function("reid_1000_points", |b| {
        b.iter(|| {
            for p in &points {
                black_box(classifier.min_separation(black_box(p)));
            }
        });
    });

    group.finish();
}

fn bench_sampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler");
    let shell = reference_shell();

    group.bench_function("sample_parallel_100k", |b| {
        b.iter(|| sample_parallel(black_box(&shell), 100_000, 42, 8192));
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_min_separation, bench_sampler);
criterion_main!(benches);
