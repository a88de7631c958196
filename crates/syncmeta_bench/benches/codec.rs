//! Entry-line codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use syncmeta_bench::{generate_entries, generate_entries_record};
use syncmeta_codec::{
    parse_entries, parse_entries_lenient, serialize_entries, serialize_permissions,
    ResourceSyncEntry,
};

/// Benchmark parsing single entry lines.
fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_line");

    group.bench_function("file", |b| {
        let line = "/main.c/1.14/Thu Jan 01 00:00:00 1970/-kb/Trelease-1";
        b.iter(|| {
            let entry = ResourceSyncEntry::parse(black_box(line)).unwrap();
            black_box(entry);
        });
    });

    group.bench_function("merged_with_conflicts", |b| {
        let line = "/main.c/1.14/Result of merge+Thu Jan 01 00:00:00 1970//";
        b.iter(|| {
            let entry = ResourceSyncEntry::parse(black_box(line)).unwrap();
            black_box(entry);
        });
    });

    group.bench_function("directory", |b| {
        b.iter(|| {
            let entry = ResourceSyncEntry::parse(black_box("D/src////")).unwrap();
            black_box(entry);
        });
    });

    group.finish();
}

/// Benchmark parsing whole entries records.
fn bench_parse_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_record");

    for count in [10, 100, 1000].iter() {
        let record = generate_entries_record(*count);
        group.throughput(Throughput::Bytes(record.len() as u64));
        group.bench_with_input(BenchmarkId::new("strict", count), &record, |b, record| {
            b.iter(|| {
                let entries = parse_entries(black_box(record)).unwrap();
                black_box(entries);
            });
        });
        group.bench_with_input(BenchmarkId::new("lenient", count), &record, |b, record| {
            b.iter(|| {
                let parsed = parse_entries_lenient(black_box(record)).unwrap();
                black_box(parsed);
            });
        });
    }

    group.finish();
}

/// Benchmark serializing entries and permissions records.
fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("entries", count), count, |b, &count| {
            let entries = generate_entries(count);
            b.iter(|| {
                let bytes = serialize_entries(black_box(&entries));
                black_box(bytes);
            });
        });
        group.bench_with_input(BenchmarkId::new("permissions", count), count, |b, &count| {
            let entries: Vec<_> = generate_entries(count)
                .into_iter()
                .map(|entry| entry.with_permissions(Some("u=rw,g=r,o=r")))
                .collect();
            b.iter(|| {
                let bytes = serialize_permissions(black_box(&entries));
                black_box(bytes);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_line, bench_parse_record, bench_serialize);

criterion_main!(benches);
