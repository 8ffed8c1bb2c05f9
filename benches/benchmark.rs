use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use ordmap::{AvlMap, BstMap};

const N: usize = 100_000;

pub fn benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i32> = (1..=N).map(|_| rng.gen()).collect();

    c.bench_function("avl_insert", |b| {
        let mut map = AvlMap::new();
        b.iter(|| {
            for value in &values {
                map.insert(*value, *value);
            }
        })
    });

    let mut map = AvlMap::new();
    for value in &values {
        map.insert(*value, *value);
    }

    c.bench_function("avl_get", |b| {
        b.iter(|| {
            for value in &values {
                black_box(map.get(value));
            }
        })
    });

    c.bench_function("avl_iter", |b| {
        b.iter(|| {
            for (k, v) in &map {
                black_box((k, v));
            }
        })
    });

    c.bench_function("avl_remove", |b| {
        let mut map = map.clone();
        b.iter(|| {
            for value in &values {
                map.remove(value);
            }
        })
    });

    c.bench_function("bst_insert", |b| {
        let mut map = BstMap::new();
        b.iter(|| {
            for value in &values {
                map.insert(*value, *value);
            }
        })
    });

    let mut bst = BstMap::new();
    for value in &values {
        bst.insert(*value, *value);
    }

    c.bench_function("bst_get", |b| {
        b.iter(|| {
            for value in &values {
                black_box(bst.get(value));
            }
        })
    });
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
