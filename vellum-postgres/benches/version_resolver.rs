//! Benchmarks for stream version resolution.
//!
//! Resolving a version sums the event counts of every commit in a stream, so
//! the cost grows with commit count. These benchmarks measure that growth
//! against a real database and the pure summation on its own.
//!
//! The database benchmarks require Docker to be running.
//!
//! Run with: `cargo bench -p vellum-postgres --bench version_resolver`

use std::{hint::black_box, sync::OnceLock};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::runtime::Runtime;
use vellum_core::{event::Event, event_store::EventStore, version};
use vellum_postgres::Store;

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

            Store::<()>::new(pool.clone()).migrate().await.unwrap();

            BenchDb {
                _container: container,
                pool,
            }
        })
    })
}

fn bench_resolve_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_counts");

    for commits in [10_u64, 1_000, 100_000] {
        let counts: Vec<u64> = (0..commits).map(|n| n % 5 + 1).collect();
        group.bench_with_input(BenchmarkId::from_parameter(commits), &counts, |b, counts| {
            b.iter(|| version::resolve(black_box(counts).iter().copied()));
        });
    }

    group.finish();
}

fn bench_current_version(c: &mut Criterion) {
    let db = get_bench_db();
    let rt = get_runtime();
    let store = EventStore::new(Store::<()>::new(db.pool.clone()));

    let mut group = c.benchmark_group("current_version");

    for commits in [10_u64, 100, 1_000] {
        let stream = format!("bench-{commits}");
        rt.block_on(async {
            let mut expected = None;
            for n in 0..commits {
                let event = Event::new("bench.tick", json!({ "n": n }), ());
                let committed = store
                    .append(&stream, expected, vec![event])
                    .await
                    .unwrap()
                    .unwrap();
                expected = Some(committed.last_version);
            }
        });

        group.bench_with_input(BenchmarkId::from_parameter(commits), &stream, |b, stream| {
            b.iter(|| rt.block_on(async { store.current_version(stream).await.unwrap() }));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve_counts, bench_current_version);
criterion_main!(benches);
