//! Benchmarks for the `PostgreSQL` snapshot store.
//!
//! These benchmarks require Docker to be running and will spin up a `PostgreSQL`
//! container using testcontainers.
//!
//! Run with: `cargo bench -p vellum-postgres --bench snapshot_store`

use std::sync::OnceLock;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::runtime::Runtime;
use uuid::Uuid;
use vellum_core::snapshot::{SnapshotState, SnapshotStore};
use vellum_postgres::snapshot::Store;

/// Shared database for benchmarks (to avoid spinning up containers per benchmark)
struct BenchDb {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

static BENCH_DB: OnceLock<BenchDb> = OnceLock::new();

fn get_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| Runtime::new().expect("Failed to create Tokio runtime"))
}

fn get_bench_db() -> &'static BenchDb {
    BENCH_DB.get_or_init(|| {
        get_runtime().block_on(async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string = format!("postgres://postgres:postgres@{host}:{port}/postgres");
            let pool = PgPool::connect(&connection_string).await.unwrap();

            Store::new(pool.clone()).migrate().await.unwrap();

            BenchDb {
                _container: container,
                pool,
            }
        })
    })
}

fn state(size: usize) -> SnapshotState {
    SnapshotState::new("bench.page", vec![0_u8; size])
}

fn bench_snapshot_read(c: &mut Criterion) {
    let db = get_bench_db();
    let rt = get_runtime();
    let store = Store::new(db.pool.clone());

    // Each key carries some demoted history so reads exercise the latest filter.
    let keys: Vec<String> = (0..100).map(|_| Uuid::new_v4().to_string()).collect();
    rt.block_on(async {
        for key in &keys {
            store.write(key, &state(1024), None, 0).await.unwrap();
            for version in 1..5 {
                store
                    .write(key, &state(1024), Some(version - 1), version)
                    .await
                    .unwrap();
            }
        }
    });

    let mut group = c.benchmark_group("snapshot_read");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read_existing_1kb", |b| {
        let mut idx = 0;
        b.iter(|| {
            let key = &keys[idx % keys.len()];
            idx += 1;
            rt.block_on(async { store.read(key).await.unwrap() })
        });
    });

    group.bench_function("read_missing", |b| {
        b.iter(|| {
            let key = Uuid::new_v4().to_string();
            rt.block_on(async { store.read(&key).await.unwrap() })
        });
    });

    group.finish();
}

fn bench_snapshot_write(c: &mut Criterion) {
    let db = get_bench_db();
    let rt = get_runtime();
    let store = Store::new(db.pool.clone());

    let mut group = c.benchmark_group("snapshot_write");
    group.throughput(Throughput::Elements(1));

    group.bench_function("first_write_1kb", |b| {
        b.iter(|| {
            let key = Uuid::new_v4().to_string();
            rt.block_on(async { store.write(&key, &state(1024), None, 0).await.unwrap() })
        });
    });

    group.bench_function("replace_1kb", |b| {
        let key = Uuid::new_v4().to_string();
        let mut version = 0_u64;
        rt.block_on(async { store.write(&key, &state(1024), None, 0).await.unwrap() });

        b.iter(|| {
            let old = version;
            version += 1;
            rt.block_on(async {
                store
                    .write(&key, &state(1024), Some(old), old + 1)
                    .await
                    .unwrap();
            });
        });
    });

    group.finish();
}

fn bench_snapshot_sizes(c: &mut Criterion) {
    let db = get_bench_db();
    let rt = get_runtime();
    let store = Store::new(db.pool.clone());

    let mut group = c.benchmark_group("snapshot_sizes");

    for size in [1024_usize, 16 * 1024, 256 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("first_write", size), &size, |b, &size| {
            b.iter(|| {
                let key = Uuid::new_v4().to_string();
                rt.block_on(async { store.write(&key, &state(size), None, 0).await.unwrap() })
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_snapshot_read,
    bench_snapshot_write,
    bench_snapshot_sizes
);
criterion_main!(benches);
