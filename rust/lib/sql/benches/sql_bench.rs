use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gallery_sql::{SQLStore, Select, SqliteStore, Value};

const TAGS: [&str; 6] = ["sea", "forest", "portrait", "city", "night", "abstract"];

fn seeded_store(rows: i64) -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .exec_batch(
            "CREATE TABLE bench (id TEXT PRIMARY KEY, title TEXT, tags TEXT, created_at TEXT);
             CREATE TABLE marks (id TEXT PRIMARY KEY, item_id TEXT, user_id TEXT,
                                 UNIQUE (user_id, item_id));",
        )
        .unwrap();

    for i in 0..rows {
        let tags = format!(
            "[\"{}\",\"{}\"]",
            TAGS[(i % 6) as usize],
            TAGS[((i / 6) % 6) as usize]
        );
        store
            .exec(
                "INSERT INTO bench (id, title, tags, created_at) VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::Text(format!("item-{i}")),
                    Value::Text(format!("Artwork number {i}")),
                    Value::Text(tags),
                    Value::Text(format!("2024-01-01T00:00:{:02}Z", i % 60)),
                ],
            )
            .unwrap();
        for u in 0..(i % 5) {
            store
                .exec(
                    "INSERT INTO marks (id, item_id, user_id) VALUES (?1, ?2, ?3)",
                    &[
                        Value::Text(format!("m-{i}-{u}")),
                        Value::Text(format!("item-{i}")),
                        Value::Text(format!("user-{u}")),
                    ],
                )
                .unwrap();
        }
    }
    store
}

fn bench_overlaps(c: &mut Criterion) {
    let store = seeded_store(5000);
    let select = Select::from("bench")
        .overlaps("tags", vec!["sea".into(), "night".into()])
        .range(0, 200);
    let (sql, params) = select.to_sql();

    c.bench_function("select_tags_overlap_200", |b| {
        b.iter(|| {
            let rows = store.query(black_box(&sql), &params).unwrap();
            assert_eq!(rows.len(), 200);
        });
    });
}

fn bench_ilike(c: &mut Criterion) {
    let store = seeded_store(5000);
    let (sql, params) = Select::from("bench")
        .ilike("title", "NUMBER 42")
        .range(0, 200)
        .to_sql();

    c.bench_function("select_title_ilike", |b| {
        b.iter(|| {
            let rows = store.query(black_box(&sql), &params).unwrap();
            assert!(!rows.is_empty());
        });
    });
}

fn bench_count_marks(c: &mut Criterion) {
    let store = seeded_store(5000);
    let ids: Vec<Value> = (0..200).map(|i| Value::Text(format!("item-{i}"))).collect();
    let (sql, params) = Select::from("marks")
        .columns(&["item_id"])
        .is_in("item_id", ids)
        .to_sql();

    c.bench_function("select_marks_for_200_items", |b| {
        b.iter(|| {
            let rows = store.query(black_box(&sql), &params).unwrap();
            assert!(!rows.is_empty());
        });
    });
}

criterion_group!(benches, bench_overlaps, bench_ilike, bench_count_marks);
criterion_main!(benches);
