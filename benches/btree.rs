//! B+Tree benchmarks for StrataDB
//!
//! Trees are kept under the default page ceiling, so every run fits in the
//! page store without eviction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stratadb::{Row, Table};
use tempfile::tempdir;

const COUNTS: [u32; 2] = [50, 150];

fn row(id: u32) -> Row {
    Row::new(id, format!("user{}", id), format!("person{}@example.com", id)).unwrap()
}

fn filled_table(count: u32) -> (tempfile::TempDir, Table) {
    let dir = tempdir().unwrap();
    let mut table = Table::open(dir.path().join("bench.db")).unwrap();
    for id in 0..count {
        table.insert(&row(id)).unwrap();
    }
    (dir, table)
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_insert");

    for count in COUNTS {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, &count| {
            b.iter_with_setup(
                || {
                    let dir = tempdir().unwrap();
                    let table = Table::open(dir.path().join("bench.db")).unwrap();
                    (dir, table)
                },
                |(dir, mut table)| {
                    for id in 0..count {
                        table.insert(&row(id)).unwrap();
                    }
                    (dir, table)
                },
            );
        });

        group.bench_with_input(BenchmarkId::new("descending", count), &count, |b, &count| {
            b.iter_with_setup(
                || {
                    let dir = tempdir().unwrap();
                    let table = Table::open(dir.path().join("bench.db")).unwrap();
                    (dir, table)
                },
                |(dir, mut table)| {
                    for id in (0..count).rev() {
                        table.insert(&row(id)).unwrap();
                    }
                    (dir, table)
                },
            );
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_lookup");

    for count in COUNTS {
        let (_dir, mut table) = filled_table(count);
        group.bench_with_input(BenchmarkId::new("select_one", count), &count, |b, &count| {
            let mut id = 0;
            b.iter(|| {
                id = (id + 7) % count;
                black_box(table.select_one(black_box(id)).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_scan");

    for count in COUNTS {
        let (_dir, mut table) = filled_table(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("select_all", count), &count, |b, _| {
            b.iter(|| black_box(table.select_all().unwrap()));
        });
    }

    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_delete");

    for count in COUNTS {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("drain", count), &count, |b, &count| {
            b.iter_with_setup(
                || filled_table(count),
                |(dir, mut table)| {
                    for id in 0..count {
                        table.delete(id).unwrap();
                    }
                    (dir, table)
                },
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_scan, bench_delete);
criterion_main!(benches);
