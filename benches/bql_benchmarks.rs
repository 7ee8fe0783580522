//! Benchmarks for the BQL pipeline.
//!
//! - Parsing (BQL text → AST)
//! - Option resolution
//! - Generation for each backend
//! - Full compile → optimize → generate
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bql::ast::{optimize, parse, Target};
use bql::compiler::BqlCompiler;
use bql::options::{OptionValue, Options};

// ---------------------------------------------------------------------------
// BQL inputs organized by shape
// ---------------------------------------------------------------------------

const SIMPLE_SELECT: &str = "select id from logs where a = :a";

const AND_OR: &str = "select id from `logs` WHERE (a = :p1 or b = :p2) and c = :p3 and not d = :missing";

const IN_LIST: &str = "select id, name from users where id in (1, 2, :ids) and status not in (:statuses)";

const FULL_SELECT: &str = "select id as k, users.name as n, wms.users.age \
    from wms.topic PARTITION (p1, p2, p3) as t \
    where t.id = :id or a between :low and :high AND id in (4, 5, :ids) \
    group by `groupId` \
    order by orderId desc \
    limit :offset, :count";

const ARITHMETIC: &str = "select id from users where (flag & :flag) > 0 and (id + 4) / 10 = :n";

const INSERT_QUERY: &str = "insert into logs (a, b, c) values (:a, :b, 1), (2, :b, 3) \
    on duplicate key update a = :a, b = :missing";

const UPDATE_QUERY: &str = "update logs set a = a + :a, b = :b where id = :id limit :n";

const DELETE_QUERY: &str = "delete from sessions where id not in (:ids) and a = :a";

fn bench_options() -> Options {
    let mut options = Options::new();
    options.insert("a".into(), 10.into());
    options.insert("b".into(), "x".into());
    options.insert("p1".into(), 1.into());
    options.insert("p2".into(), 2.into());
    options.insert("p3".into(), 3.into());
    options.insert("id".into(), 7.into());
    options.insert("low".into(), 10.into());
    options.insert("high".into(), 20.into());
    options.insert("flag".into(), 4.into());
    options.insert("n".into(), 2.into());
    options.insert("offset".into(), 0.into());
    options.insert("count".into(), 20.into());
    options.insert("ids".into(), OptionValue::list(1..=50i64));
    options.insert("statuses".into(), OptionValue::list(["closed", "spam"]));
    options
}

const CASES: [(&str, &str); 8] = [
    ("simple_select", SIMPLE_SELECT),
    ("and_or", AND_OR),
    ("in_list", IN_LIST),
    ("full_select", FULL_SELECT),
    ("arithmetic", ARITHMETIC),
    ("insert", INSERT_QUERY),
    ("update", UPDATE_QUERY),
    ("delete", DELETE_QUERY),
];

// ---------------------------------------------------------------------------
// Benchmark groups
// ---------------------------------------------------------------------------

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    for (name, bql) in &CASES {
        group.bench_with_input(BenchmarkId::new("parse", name), bql, |b, bql| {
            b.iter(|| parse(black_box(bql)).unwrap());
        });
    }

    group.finish();
}

fn bench_optimization(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimization");
    let options = bench_options();

    for (name, bql) in &CASES {
        let ast = parse(bql).unwrap();
        group.bench_with_input(BenchmarkId::new("optimize", name), &ast, |b, ast| {
            b.iter(|| optimize(black_box(ast.clone()), &options).unwrap());
        });
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    let options = bench_options();

    for target in [Target::Sql, Target::Search] {
        let generator = target.generator(&options);
        for (name, bql) in &CASES {
            let (ast, _) = optimize(parse(bql).unwrap(), &options).unwrap();
            group.bench_with_input(
                BenchmarkId::new(target.name(), name),
                &ast,
                |b, ast| {
                    b.iter(|| generator.generate(black_box(ast)));
                },
            );
        }
    }

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    let compiler = BqlCompiler::new();
    let options = bench_options();

    for (name, bql) in &CASES {
        group.bench_with_input(
            BenchmarkId::new("compile_optimize_generate", name),
            bql,
            |b, bql| {
                b.iter(|| {
                    let compiled = compiler.compile(black_box(bql)).unwrap();
                    compiled.optimize(&options).unwrap().to_sql()
                });
            },
        );
    }

    // One compiled statement reused across many option maps.
    let compiled = compiler.compile(FULL_SELECT).unwrap();
    group.bench_function("reuse_compiled", |b| {
        b.iter(|| compiled.optimize(black_box(&options)).unwrap().to_sql());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parsing,
    bench_optimization,
    bench_generation,
    bench_round_trip,
);
criterion_main!(benches);
