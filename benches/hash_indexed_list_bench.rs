use array_collections::{Direction, HashIndexedList};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand_core::{RngCore, SeedableRng};
use rand_pcg::Lcg128Xsl64 as Pcg;

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (HashIndexedList<String>, Vec<String>) {
    let mut rng = Pcg::seed_from_u64(seed);
    let keys: Vec<String> = (0..n).map(|_| key(rng.next_u64())).collect();
    let list = keys.iter().cloned().collect();
    (list, keys)
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("list::insert");
    group.throughput(Throughput::Elements(100_000));
    group.bench_function("add_fresh_100k", |b| {
        b.iter_batched(
            HashIndexedList::<String>::new,
            |mut l| {
                let mut rng = Pcg::seed_from_u64(1);
                for _ in 0..100_000 {
                    l.add(key(rng.next_u64())).unwrap();
                }
                black_box(l)
            },
            BatchSize::SmallInput,
        )
    });
    group.bench_function("add_all_100k", |b| {
        let mut rng = Pcg::seed_from_u64(2);
        let keys: Vec<String> = (0..100_000).map(|_| key(rng.next_u64())).collect();
        b.iter_batched(
            || (HashIndexedList::<String>::new(), keys.clone()),
            |(mut l, keys)| {
                black_box(l.add_all(keys).unwrap());
                black_box(l)
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("list::query");
    group.throughput(Throughput::Elements(10_000));
    let (list, keys) = filled(3, 100_000);
    let mut rng = Pcg::seed_from_u64(0x9e3779b97f4a7c15);
    let hits: Vec<String> = (0..10_000)
        .map(|_| keys[(rng.next_u64() as usize) % keys.len()].clone())
        .collect();
    group.bench_function("index_of_hit_10k_on_100k", |b| {
        b.iter(|| {
            for k in &hits {
                black_box(list.index_of(k.as_str()).unwrap());
            }
        })
    });
    group.bench_function("index_of_miss_10k_on_100k", |b| {
        let mut miss = Pcg::seed_from_u64(0xdead_beefu64);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next_u64());
                black_box(list.index_of(k.as_str()).unwrap());
            }
        })
    });
    // windowed lookups reject hits outside the view
    let view = list.view(25_000, 50_000).unwrap();
    group.bench_function("view_contains_10k_on_100k", |b| {
        b.iter(|| {
            for k in &hits {
                black_box(view.contains(k.as_str()).unwrap());
            }
        })
    });
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("list::remove");
    group.throughput(Throughput::Elements(1_000));
    group.bench_function("remove_random_1k_of_20k", |b| {
        b.iter_batched(
            || {
                let (list, keys) = filled(5, 20_000);
                let mut rng = Pcg::seed_from_u64(6);
                let doomed: Vec<String> = (0..1_000)
                    .map(|_| keys[(rng.next_u64() as usize) % keys.len()].clone())
                    .collect();
                (list, doomed)
            },
            |(mut list, doomed)| {
                for k in &doomed {
                    black_box(list.remove(k.as_str()).unwrap());
                }
                black_box(list)
            },
            BatchSize::SmallInput,
        )
    });
    // one compaction pass, compared with the loop above
    group.bench_function("remove_all_1k_of_20k", |b| {
        b.iter_batched(
            || {
                let (list, keys) = filled(5, 20_000);
                let mut rng = Pcg::seed_from_u64(6);
                let doomed: Vec<String> = (0..1_000)
                    .map(|_| keys[(rng.next_u64() as usize) % keys.len()].clone())
                    .collect();
                (list, doomed)
            },
            |(mut list, doomed)| {
                black_box(list.remove_all(doomed).unwrap());
                black_box(list)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("list::views");
    group.throughput(Throughput::Elements(1_000));
    // fix-up cost grows with the number of live views
    for views in [0usize, 16, 256] {
        group.bench_function(format!("insert_front_1k_with_{views}_views"), |b| {
            b.iter_batched(
                || {
                    let (list, _) = filled(7, 10_000);
                    let handles: Vec<_> = (0..views)
                        .map(|i| list.view(i * 10, 20).unwrap())
                        .collect();
                    (list, handles)
                },
                |(mut list, handles)| {
                    for i in 0..1_000u64 {
                        list.insert_first(format!("new{i}")).unwrap();
                    }
                    black_box((list, handles))
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.bench_function("slide_view_1k", |b| {
        let (list, _) = filled(8, 10_000);
        let mut view = list.view(0, 100).unwrap();
        b.iter(|| {
            for step in 0..1_000isize {
                let delta = if step % 2 == 0 { 50 } else { -50 };
                view.slide(delta).unwrap();
            }
        })
    });
    group.finish();
}

fn bench_traverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("list::traverse");
    group.throughput(Throughput::Elements(10_000));
    let (list, _) = filled(9, 10_000);
    group.bench_function("cursor_10k", |b| {
        b.iter(|| {
            let mut cursor = list.cursor(Direction::Forwards).unwrap();
            let mut total = 0usize;
            while let Ok(Some(k)) = list.step(&mut cursor) {
                total += k.len();
            }
            black_box(total)
        })
    });
    group.bench_function("shuffle_then_sort_10k", |b| {
        let mut rng = Pcg::seed_from_u64(10);
        b.iter_batched(
            || filled(9, 10_000).0,
            |mut l| {
                l.shuffle(&mut rng).unwrap();
                l.sort().unwrap();
                black_box(l)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_config() -> Criterion {
    Criterion::default()
}

criterion_group! {
    name = benches_list_insert;
    config = bench_config();
    targets = bench_insert
}
criterion_group! {
    name = benches_list_ops;
    config = bench_config();
    targets = bench_query,
              bench_remove,
              bench_views,
              bench_traverse
}
criterion_main!(benches_list_insert, benches_list_ops);
