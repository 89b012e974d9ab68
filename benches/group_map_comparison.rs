use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use group_hash::HashTable as GroupHashTable;
use group_hash::Uint64Map;
use hashbrown::HashMap as HashbrownHashMap;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::distr;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

trait KeyValuePair: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

#[derive(Clone)]
struct TestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_items<TestItem: KeyValuePair>(count: usize) -> Vec<(u64, TestItem)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let key = rng.try_next_u64().unwrap();
            let item = TestItem::new(key);
            let hash = item.hash_key();
            (hash, item)
        })
        .collect()
}

fn upsert<TestItem: KeyValuePair>(table: &mut GroupHashTable<'_, TestItem>, hash: u64, item: TestItem) {
    match table.find_mut(hash, |v| v.eq_key(&item)) {
        Some(existing) => *existing = item,
        None => table.insert_unique(hash, item),
    }
}

fn bench_insert_random<TestItem: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let hash_and_item = random_items::<TestItem>(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("group_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    let mut table = GroupHashTable::<TestItem>::with_capacity(0);
                    for (hash, item) in hash_and_item {
                        upsert(&mut table, hash, item);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    let mut table = HashbrownHashTable::with_capacity(0);
                    for (hash, item) in hash_and_item {
                        match table.entry(hash, |v: &TestItem| v.eq_key(&item), |v| v.hash_key()) {
                            HashbrownEntry::Vacant(entry) => {
                                black_box(entry.insert(item));
                            }
                            HashbrownEntry::Occupied(mut entry) => {
                                *entry.get_mut() = item;
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss<TestItem: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let present = random_items::<TestItem>(size);
        let mut probes = present.clone();
        probes.extend(random_items::<TestItem>(size));
        probes.shuffle(&mut SmallRng::from_os_rng());

        let mut group_table = GroupHashTable::<TestItem>::with_capacity(size);
        let mut hashbrown_table = HashbrownHashTable::<TestItem>::with_capacity(size);
        for (hash, item) in present {
            hashbrown_table.insert_unique(hash, item.clone(), |v| v.hash_key());
            upsert(&mut group_table, hash, item);
        }

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("group_hash/{size}"), |b| {
            b.iter(|| {
                for (hash, item) in &probes {
                    black_box(group_table.find(*hash, |v| v.eq_key(item)));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for (hash, item) in &probes {
                    black_box(hashbrown_table.find(*hash, |v| v.eq_key(item)));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove<TestItem: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<TestItem>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let hash_and_item = random_items::<TestItem>(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("group_hash_fast/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = GroupHashTable::<TestItem>::with_capacity(size);
                    for (hash, item) in hash_and_item.iter().cloned() {
                        upsert(&mut table, hash, item);
                    }
                    table
                },
                |mut table| {
                    for (hash, item) in &hash_and_item {
                        black_box(table.remove(*hash, |v| v.eq_key(item)));
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("group_hash_clearing/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = GroupHashTable::<TestItem>::with_capacity(size);
                    for (hash, item) in hash_and_item.iter().cloned() {
                        upsert(&mut table, hash, item);
                    }
                    table
                },
                |mut table| {
                    for (hash, item) in &hash_and_item {
                        black_box(table.remove_and_clear(*hash, |v| v.eq_key(item)));
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = HashbrownHashTable::<TestItem>::with_capacity(size);
                    for (hash, item) in hash_and_item.iter().cloned() {
                        table.insert_unique(hash, item, |v| v.hash_key());
                    }
                    table
                },
                |mut table| {
                    for (hash, item) in &hash_and_item {
                        let removed = match table.find_entry(*hash, |v| v.eq_key(item)) {
                            Ok(entry) => Some(entry.remove().0),
                            Err(_) => None,
                        };
                        black_box(removed);
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Remove,
    Find,
}

fn bench_mixed_probabilistic_zipf<TestItem: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "mixed_probabilistic_zipf_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    const KEY_SPACE_MULTIPLIER: f32 = 2.0;

    for &size in SIZES {
        let mut rng = SmallRng::from_os_rng();
        let operations = (0..size * 3)
            .map(|_| {
                let op_choice: f64 = rng.sample(distr::Uniform::new(0.0, 1.0).unwrap());
                if op_choice < 0.5 {
                    Operation::Find
                } else if op_choice < 0.75 {
                    Operation::Insert
                } else {
                    Operation::Remove
                }
            })
            .collect::<Vec<Operation>>();

        let insert_distr = Zipf::new(size as f32, 1.0).unwrap();
        let find_remove_distr = Zipf::new(size as f32 * KEY_SPACE_MULTIPLIER, 1.0).unwrap();
        let keys = operations
            .iter()
            .map(|op| match op {
                Operation::Insert => rng.sample(insert_distr) as u64,
                Operation::Remove | Operation::Find => rng.sample(find_remove_distr) as u64,
            })
            .map(|key| {
                let item = TestItem::new(key);
                (item.hash_key(), item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        group.throughput(Throughput::Elements(operations.len() as u64));
        group.bench_function(format!("group_hash/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut table = GroupHashTable::<TestItem>::with_capacity(0);
                    for (op, (hash, item)) in operations.iter().zip(keys) {
                        match op {
                            Operation::Insert => upsert(&mut table, hash, item),
                            Operation::Remove => {
                                black_box(table.remove(hash, |v| v.eq_key(&item)));
                            }
                            Operation::Find => {
                                black_box(table.find(hash, |v| v.eq_key(&item)));
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut table = HashbrownHashTable::<TestItem>::with_capacity(0);
                    for (op, (hash, item)) in operations.iter().zip(keys) {
                        match op {
                            Operation::Insert => {
                                match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
                                    HashbrownEntry::Vacant(entry) => {
                                        black_box(entry.insert(item));
                                    }
                                    HashbrownEntry::Occupied(mut occupied) => {
                                        *occupied.get_mut() = item;
                                    }
                                }
                            }
                            Operation::Remove => {
                                let result = match table.find_entry(hash, |v| v.eq_key(&item)) {
                                    Ok(entry) => Some(entry.remove().0),
                                    Err(_) => None,
                                };
                                black_box(result);
                            }
                            Operation::Find => {
                                black_box(table.find(hash, |v| v.eq_key(&item)));
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration<TestItem: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "iteration_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let mut group_table = GroupHashTable::<TestItem>::with_capacity(size);
        let mut hashbrown_table = HashbrownHashTable::<TestItem>::with_capacity(size);
        for (hash, item) in random_items::<TestItem>(size) {
            hashbrown_table.insert_unique(hash, item.clone(), |v| v.hash_key());
            upsert(&mut group_table, hash, item);
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("group_hash/{size}"), |b| {
            b.iter(|| {
                for item in group_table.iter() {
                    black_box(item);
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for item in hashbrown_table.iter() {
                    black_box(item);
                }
            })
        });
    }

    group.finish();
}

fn bench_uint64_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("uint64_sequential");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let mut keys = (1..=size as u64).collect::<Vec<u64>>();
        keys.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(size as u64 * 2));
        group.bench_function(format!("uint64_map/{size}"), |b| {
            b.iter(|| {
                let mut map = Uint64Map::with_capacity(0);
                for &k in &keys {
                    map.insert(k, k);
                }
                for &k in &keys {
                    black_box(map.get(k));
                }
                black_box(map)
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut map = HashbrownHashMap::with_capacity(0);
                for &k in &keys {
                    map.insert(k, k);
                }
                for k in &keys {
                    black_box(map.get(k));
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallTestItem>,
    bench_insert_random::<TestItem>,
    bench_find_hit_miss::<SmallTestItem>,
    bench_find_hit_miss::<TestItem>,
    bench_remove::<SmallTestItem>,
    bench_remove::<TestItem>,
    bench_mixed_probabilistic_zipf::<SmallTestItem>,
    bench_mixed_probabilistic_zipf::<TestItem>,
    bench_iteration::<SmallTestItem>,
    bench_iteration::<TestItem>,
    bench_uint64_sequential,
);

criterion_main!(benches);
