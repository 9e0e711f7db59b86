//! Engine throughput benchmarks: synchronous puts, reads, transaction
//! commits, and prefix iteration.

use cofferdb::{Coffer, Value};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use tempfile::TempDir;

fn open_bench_db(dir: &TempDir) -> Coffer {
    Coffer::builder()
        .path(dir.path())
        .autosave_interval(None)
        .open()
        .unwrap()
}

fn bench_put(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = open_bench_db(&dir);
    let mut rng = StdRng::seed_from_u64(7);
    c.bench_function("put_scalar", |b| {
        b.iter(|| {
            let key = format!("bench:{:08}", rng.gen::<u32>());
            db.put(&key, Value::Scalar("payload".to_string())).unwrap()
        })
    });
}

fn bench_get(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = open_bench_db(&dir);
    for i in 0..10_000u32 {
        db.put(&format!("key:{i:08}"), Value::Scalar(i.to_string()))
            .unwrap();
    }
    let mut rng = StdRng::seed_from_u64(7);
    c.bench_function("get_scalar", |b| {
        b.iter(|| {
            let key = format!("key:{:08}", rng.gen_range(0..10_000u32));
            black_box(db.get(&key).unwrap())
        })
    });
}

fn bench_txn_commit(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = open_bench_db(&dir);
    let mut rng = StdRng::seed_from_u64(7);
    c.bench_function("txn_commit_4_writes", |b| {
        b.iter(|| {
            let mut txn = db.begin(true);
            for _ in 0..4 {
                let key = format!("txn:{:08}", rng.gen::<u32>());
                txn.write(&key, Value::Scalar("payload".to_string()))
                    .unwrap();
            }
            txn.commit().unwrap()
        })
    });
}

fn bench_prefix_iteration(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = open_bench_db(&dir);
    for i in 0..1_000u32 {
        db.put(&format!("scan:{i:04}"), Value::Scalar(i.to_string()))
            .unwrap();
    }
    c.bench_function("iterate_1k_prefix", |b| {
        b.iter(|| {
            let mut iter = db.iter("scan:", false);
            let mut count = 0usize;
            while iter.valid() {
                count += 1;
                iter.next();
            }
            black_box(count)
        })
    });
}

criterion_group!(
    benches,
    bench_put,
    bench_get,
    bench_txn_commit,
    bench_prefix_iteration
);
criterion_main!(benches);
