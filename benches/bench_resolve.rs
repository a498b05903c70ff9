use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rowfs::{
    Record, RowFs, SqliteRowStore,
    resolver::{lookup, read_dir_all},
};

const GROUPS: i64 = 16;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

fn bench_scale() -> usize {
    #[cfg(feature = "bench-ci")]
    {
        2_000
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        20_000
    }
}

fn generate_records(rows: usize) -> Vec<Record> {
    (0..rows)
        .map(|i| {
            let id = i as i64 + 1;
            Record::new(
                id,
                id % GROUPS,
                &format!("site/section{}/page{id}", i % 32),
            )
            .with_content(format!("<p>{id}</p>"))
        })
        .collect()
}

fn bench_read_dir(c: &mut Criterion) {
    let records = generate_records(bench_scale());
    let mut group = c.benchmark_group("read_dir_all");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prefix in ["", "3", "3/site", "3/site/section3"] {
        group.bench_with_input(BenchmarkId::from_parameter(prefix), prefix, |b, prefix| {
            b.iter(|| read_dir_all(&records, prefix));
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let records = generate_records(bench_scale());
    let last = records.last().map(|r| r.id).unwrap_or(1);
    let leaf = format!("page{last}");
    let mut group = c.benchmark_group("lookup");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    group.bench_function("directory", |b| {
        b.iter(|| lookup(&records, "3", "site"));
    });
    group.bench_function("missing", |b| {
        b.iter(|| lookup(&records, "3/site", "absent"));
    });
    let parent = records
        .last()
        .map(|r| r.full_path())
        .and_then(|p| p.rsplit_once('/').map(|(dir, _)| dir.to_string()))
        .unwrap_or_default();
    group.bench_function("last_file", |b| {
        b.iter(|| lookup(&records, &parent, &leaf));
    });
    group.finish();
}

fn bench_store_walk(c: &mut Criterion) {
    let store = SqliteRowStore::in_memory().expect("store");
    for record in generate_records(bench_scale() / 10) {
        store.insert_record(&record).expect("insert");
    }
    let fs = RowFs::new(store);
    let mut group = c.benchmark_group("store");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    group.bench_function("root_listing", |b| {
        b.iter(|| fs.root().read_dir_all().expect("listing"));
    });
    group.finish();
}

criterion_group!(benches, bench_read_dir, bench_lookup, bench_store_walk);
criterion_main!(benches);
