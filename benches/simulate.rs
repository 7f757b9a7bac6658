use criterion::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use ecotox::prelude::*;

fn default_scenario() {
    let model = Model::default();
    black_box(simulate(&model, 500.0, &SolverSettings::default()).unwrap());
}

fn contaminated_scenario() {
    let model = Model::builder()
        .parameters(Parameters {
            theta: 0.05,
            mu: 0.02,
            ..Parameters::default()
        })
        .build()
        .unwrap();
    black_box(simulate(&model, 500.0, &SolverSettings::default()).unwrap());
}

fn derivatives() {
    let model = Model::default();
    let x = Compartments::new(0.8, 0.1, 0.1, 2.0, 0.5);
    black_box(model.derivatives(&x).unwrap());
}

fn fingerprint() {
    black_box(RunId::structural(&EquationSystem::standard()));
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("default_scenario", |b| b.iter(|| default_scenario()));
    c.bench_function("contaminated_scenario", |b| b.iter(|| contaminated_scenario()));
    c.bench_function("derivatives", |b| b.iter(|| derivatives()));
    c.bench_function("fingerprint", |b| b.iter(|| fingerprint()));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
