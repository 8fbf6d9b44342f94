use criterion::{Criterion, criterion_group, criterion_main};
use sqlgate_sql::{GatewayConfig, classify};
use std::hint::black_box;

const STATEMENTS: &[&str] = &[
    "SELECT test_id, test_value1 FROM test1 WHERE test_id = ?",
    "   insert into test2 (test_id, test_value1) values (?, ?)",
    "UPDATE test1 SET test_value2 = 'x' WHERE test_id = 1",
    "DELETE FROM test2",
    "CREATE TABLE audit (id INTEGER PRIMARY KEY, note TEXT)",
    "WITH recent AS (SELECT * FROM events) SELECT count(*) FROM recent",
];

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_mixed_statements", |b| {
        b.iter(|| {
            for sql in STATEMENTS {
                black_box(classify(black_box(sql)));
            }
        })
    });

    let policy = GatewayConfig::default().with_dml_enabled(true).policy();
    c.bench_function("authorize_mixed_statements", |b| {
        b.iter(|| {
            for sql in STATEMENTS {
                let _ = black_box(policy.authorize(black_box(sql)));
            }
        })
    });

    let long_select = format!(
        "SELECT {} FROM wide_table",
        (0..500)
            .map(|i| format!("col_{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    c.bench_function("classify_long_select", |b| {
        b.iter(|| black_box(classify(black_box(&long_select))))
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
