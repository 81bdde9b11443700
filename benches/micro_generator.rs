#![forbid(unsafe_code)]

use std::hint::black_box;

use authbench::export::{export_graph, DataFormat};
use authbench::generator::{generate, GenerationConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn sized(users: usize) -> GenerationConfig {
    GenerationConfig {
        users,
        resources: users * 3 / 5,
        groups: (users / 8).max(1),
        ..GenerationConfig::default()
    }
}

fn micro_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/generate");
    group.sample_size(20);
    for users in [500usize, 5_000] {
        let config = sized(users);
        group.throughput(Throughput::Elements(users as u64));
        group.bench_with_input(BenchmarkId::from_parameter(users), &config, |b, config| {
            b.iter(|| black_box(generate(config).expect("generate")));
        });
    }
    group.finish();
}

fn micro_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/export");
    group.sample_size(10);
    let graph = generate(&sized(2_000)).expect("generate");
    let records = (graph.node_count() + graph.edge_count()) as u64;
    group.throughput(Throughput::Elements(records));
    for format in DataFormat::ALL {
        let dir = tempfile::tempdir().expect("tmpdir");
        group.bench_with_input(
            BenchmarkId::from_parameter(format),
            &format,
            |b, &format| {
                b.iter(|| black_box(export_graph(&graph, dir.path(), format).expect("export")));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, micro_generate, micro_export);
criterion_main!(benches);
