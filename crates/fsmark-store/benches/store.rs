use std::sync::Arc;
use std::thread;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use fsmark_store::{FsMarkStore, MarkerStore, StoreConfig};

/// Open a store under a fresh temp dir.
/// Returns (store, temp_dir) where temp_dir must be kept alive.
fn open_store() -> (FsMarkStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = FsMarkStore::open(StoreConfig::new(temp_dir.path().join("marks"))).unwrap();
    (store, temp_dir)
}

fn create(c: &mut Criterion) {
    let (store, _dir) = open_store();
    let mut i = 0u64;
    c.bench_function("create", |b| {
        b.iter(|| {
            store.create(black_box(&i.to_string())).unwrap();
            i += 1;
        })
    });
}

fn exist(c: &mut Criterion) {
    let (store, _dir) = open_store();
    const KEYS: u64 = 4096;
    for i in 0..KEYS {
        store.create(&i.to_string()).unwrap();
    }

    let mut i = 0u64;
    c.bench_function("exist", |b| {
        b.iter(|| {
            black_box(store.exist(&(i % KEYS).to_string()));
            i += 1;
        })
    });
}

fn create_then_exist(c: &mut Criterion) {
    let (store, _dir) = open_store();
    let mut i = 0u64;
    c.bench_function("create_then_exist", |b| {
        b.iter(|| {
            let key = i.to_string();
            store.create(&key).unwrap();
            black_box(store.exist(&key));
            i += 1;
        })
    });
}

/// Writers and readers contending on 64 overlapping keys.
fn competitive_create_and_exist(c: &mut Criterion) {
    let (store, _dir) = open_store();
    let store = Arc::new(store);
    let base = "competitive";
    store
        .create_with_ttl(base, Duration::from_secs(3600))
        .unwrap();

    c.bench_function("competitive_create_and_exist_x8", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..8)
                .flat_map(|t| {
                    let writer = Arc::clone(&store);
                    let reader = Arc::clone(&store);
                    [
                        thread::spawn(move || {
                            for i in 0..8 {
                                let key = format!("{base}{}", (t * 8 + i) % 64);
                                writer.create_with_ttl(&key, Duration::from_secs(1)).unwrap();
                            }
                        }),
                        thread::spawn(move || {
                            for i in 0..8 {
                                let key = format!("{base}{}", (t * 8 + i) % 64);
                                black_box(reader.exist(&key));
                            }
                        }),
                    ]
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
        })
    });
}

criterion_group!(
    benches,
    create,
    exist,
    create_then_exist,
    competitive_create_and_exist,
);
criterion_main!(benches);
