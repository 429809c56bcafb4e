//! Benchmarks for rrdp-mirror operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rrdp_mirror::{
    parse_snapshot_or_delta, ContentHash, PublishElement, ReconcileBuilder, RrdpDocument,
    RrdpElement, SnapshotDocument,
};

fn snapshot_xml(objects: usize, object_size: usize) -> String {
    RrdpDocument::Snapshot(SnapshotDocument {
        session_id: "9df4b597-af9e-4dca-bdda-719cce2c4e28".to_string(),
        serial: 1,
        elements: (0..objects)
            .map(|i| {
                RrdpElement::Publish(PublishElement::new(
                    format!("rsync://rpki.example.net/repo/{}/{i}.roa", i % 64),
                    None,
                    vec![(i % 251) as u8; object_size],
                ))
            })
            .collect(),
    })
    .to_xml()
}

fn bench_content_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");

    for size in [64, 2048, 65536].iter() {
        let data = vec![42u8; *size];

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("compute", size), &data, |b, data| {
            b.iter(|| ContentHash::compute(black_box(data)));
        });
    }

    group.finish();
}

fn bench_parse_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_snapshot");

    for objects in [10, 1000, 10000].iter() {
        let xml = snapshot_xml(*objects, 1024);

        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::new("objects", objects), &xml, |b, xml| {
            b.iter(|| parse_snapshot_or_delta(black_box(xml.as_bytes())).unwrap());
        });
    }

    group.finish();
}

fn bench_verify_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify_snapshot");
    let dir = tempfile::tempdir().unwrap();
    let verifier = ReconcileBuilder::new().verify_only(true).build();

    for objects in [100, 5000].iter() {
        let document = parse_snapshot_or_delta(snapshot_xml(*objects, 1024).as_bytes()).unwrap();

        group.throughput(Throughput::Elements(*objects as u64));
        group.bench_with_input(
            BenchmarkId::new("objects", objects),
            &document,
            |b, document| {
                b.iter(|| verifier.apply(black_box(document), dir.path()).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_content_hash,
    bench_parse_snapshot,
    bench_verify_snapshot
);
criterion_main!(benches);
