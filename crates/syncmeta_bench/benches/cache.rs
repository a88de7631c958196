//! Metadata cache and batch benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use syncmeta_codec::{FolderSyncEntry, ResourceSyncEntry};
use syncmeta_core::Synchronizer;
use syncmeta_store::WorkspacePath;
use syncmeta_testkit::{scenarios, TempWorkspace, TEST_ROOT};

fn entry(path: &WorkspacePath, revision: &str) -> ResourceSyncEntry {
    ResourceSyncEntry::file(path.name(), revision, None, "", None).unwrap()
}

fn write_batch(sync: &Synchronizer, dir: &WorkspacePath, size: usize, revision: &str) {
    let ctx = sync.context();
    let batch = sync.begin(ctx, dir).unwrap();
    for i in 0..size {
        let path = dir.join(&format!("f{i}.c"));
        sync.set_resource_sync(ctx, &path, Some(entry(&path, revision))).unwrap();
    }
    batch.finish().unwrap();
}

/// Benchmark single entry writes, each flushed on its own.
fn bench_single_write(c: &mut Criterion) {
    let session = scenarios::checked_out_project("p", 100);
    let ctx = session.context();
    let path = WorkspacePath::new("p/f7.c");
    let mut revision = 0u64;

    c.bench_function("single_write", |b| {
        b.iter(|| {
            revision += 1;
            let next = entry(&path, &format!("1.{revision}"));
            session.set_resource_sync(ctx, &path, Some(black_box(next))).unwrap();
        });
    });
}

/// Benchmark batches flushed once at the outermost end.
fn bench_batch_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_write");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("memory", batch_size),
            batch_size,
            |b, &batch_size| {
                let session = scenarios::checked_out_project("p", 0);
                let dir = WorkspacePath::new("p");
                let mut round = 0u64;
                b.iter(|| {
                    round += 1;
                    write_batch(&session.sync, &dir, batch_size, &format!("1.{round}"));
                });
            },
        );
    }

    for batch_size in [10, 100].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("file", batch_size),
            batch_size,
            |b, &batch_size| {
                let workspace = TempWorkspace::new();
                workspace.create_dir("p");
                let sync = workspace.open();
                let dir = WorkspacePath::new("p");
                sync.set_folder_sync(
                    sync.context(),
                    &dir,
                    Some(FolderSyncEntry::new("p", TEST_ROOT, "p").unwrap()),
                )
                .unwrap();
                let mut round = 0u64;
                b.iter(|| {
                    round += 1;
                    write_batch(&sync, &dir, batch_size, &format!("1.{round}"));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark entry lookups against a loaded and a purged cache.
fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");

    for files in [10, 100, 1000].iter() {
        let session = scenarios::checked_out_project("p", *files);
        let dir = WorkspacePath::new("p");
        let path = dir.join("f3.c");

        group.bench_with_input(BenchmarkId::new("warm", files), &path, |b, path| {
            b.iter(|| {
                let entry = session.get_resource_sync(black_box(path)).unwrap();
                black_box(entry);
            });
        });

        group.throughput(Throughput::Elements(*files as u64));
        group.bench_with_input(BenchmarkId::new("cold", files), &path, |b, path| {
            b.iter(|| {
                session.cache().purge(&dir, false);
                let entry = session.get_resource_sync(black_box(path)).unwrap();
                black_box(entry);
            });
        });
    }

    group.finish();
}

/// Benchmark listing children that exist locally or through metadata.
fn bench_list_children(c: &mut Criterion) {
    let session = scenarios::project_tree(1, 8, 50);
    let dir = WorkspacePath::new("proj");

    c.bench_function("list_children_with_sync", |b| {
        b.iter(|| {
            let children = session.cache().list_children_with_sync(black_box(&dir)).unwrap();
            black_box(children);
        });
    });
}

criterion_group!(
    benches,
    bench_single_write,
    bench_batch_write,
    bench_read,
    bench_list_children,
);

criterion_main!(benches);
