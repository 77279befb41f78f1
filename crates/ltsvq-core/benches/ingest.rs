use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ltsvq_core::{ingest, query, Delimiters, LtsvTable};

/// Access-log style input where every tenth line carries an extra field
fn sample_input(lines: usize) -> String {
    let mut input = String::new();
    for i in 0..lines {
        input.push_str(&format!(
            "host:10.0.{}.{}\tmethod:GET\tpath:/item/{}\tstatus:{}\tsize:{}",
            i % 256,
            i % 7,
            i,
            if i % 13 == 0 { 500 } else { 200 },
            i * 3
        ));
        if i % 10 == 0 {
            input.push_str(&format!("\textra_{}:x", i % 50));
        }
        input.push('\n');
    }
    input
}

fn loaded_table(lines: usize) -> LtsvTable {
    let mut table = LtsvTable::new();
    ingest(&mut table, sample_input(lines).as_bytes(), Delimiters::default()).unwrap();
    table
}

fn benchmark_ingest(c: &mut Criterion) {
    let input = sample_input(10_000);
    c.bench_function("ingest 10k lines", |b| {
        b.iter(|| {
            let mut table = LtsvTable::new();
            ingest(&mut table, input.as_bytes(), Delimiters::default()).unwrap()
        })
    });
}

fn benchmark_filter(c: &mut Criterion) {
    let table = loaded_table(10_000);
    c.bench_function("filter", |b| {
        b.iter(|| {
            table
                .query("SELECT path FROM ltsv WHERE status >= 500")
                .unwrap()
        })
    });
}

fn benchmark_group_by(c: &mut Criterion) {
    let table = loaded_table(10_000);
    c.bench_function("group by", |b| {
        b.iter(|| {
            table
                .query("SELECT host, COUNT(*) AS n, SUM(size) FROM ltsv GROUP BY host")
                .unwrap()
        })
    });
}

fn benchmark_parse(c: &mut Criterion) {
    let sql = "SELECT host, COUNT(*) AS n FROM ltsv WHERE path LIKE '/item/%' AND status IN (200, 304) \
               GROUP BY host HAVING n > 10 ORDER BY n DESC LIMIT 20";

    c.bench_function("parse query", |b| b.iter(|| query::prepare(black_box(sql))));
}

criterion_group!(
    benches,
    benchmark_ingest,
    benchmark_filter,
    benchmark_group_by,
    benchmark_parse
);
criterion_main!(benches);
