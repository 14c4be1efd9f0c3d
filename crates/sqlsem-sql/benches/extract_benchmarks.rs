//! Benchmarks for SQL reference extraction
//!
//! These benchmarks measure extraction throughput on designer-style
//! commands with growing numbers of joins and projected columns.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sqlsem_core::{Config, ConfidenceThresholds, Origin};
use sqlsem_sql::{join_edges, MetadataBundle, SqlExtractor};

/// Generate a SELECT over `num_joins + 1` tables with `num_columns` columns
fn generate_query(num_joins: usize, num_columns: usize) -> String {
    let columns: Vec<String> = (0..num_columns)
        .map(|i| format!("t{}.col_{} AS c{}", i % (num_joins + 1), i, i))
        .collect();

    let joins: Vec<String> = (1..=num_joins)
        .map(|i| {
            let kind = if i % 2 == 0 { "LEFT OUTER JOIN" } else { "INNER JOIN" };
            format!(
                "{} [dbo].[Table_{}] AS t{} ON t{}.id = t{}.parent_id",
                kind,
                i,
                i,
                i - 1,
                i
            )
        })
        .collect();

    format!(
        "SELECT {}\r\nFROM [dbo].[Table_0] AS t0 {}\r\nWHERE t0.active = 1",
        columns.join(", "),
        joins.join("\r\n")
    )
}

/// Benchmark: extraction as the join count grows
fn bench_join_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_scaling");
    let extractor = SqlExtractor::new();

    for num_joins in [1, 10, 50].iter() {
        let sql = generate_query(*num_joins, 20);

        group.bench_with_input(BenchmarkId::from_parameter(num_joins), num_joins, |b, _| {
            b.iter(|| black_box(extractor.extract(Some(&sql))));
        });
    }

    group.finish();
}

/// Benchmark: extraction as the SELECT list grows
fn bench_projection_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_scaling");
    let extractor = SqlExtractor::new();

    for num_columns in [10, 100, 500].iter() {
        let sql = generate_query(3, *num_columns);

        group.bench_with_input(BenchmarkId::from_parameter(num_columns), num_columns, |b, _| {
            b.iter(|| black_box(extractor.extract(Some(&sql))));
        });
    }

    group.finish();
}

/// Benchmark: heuristic extraction alone vs. with sqlparser validation
fn bench_strict_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("strict_validation");
    let sql = generate_query(5, 20);

    let lenient = SqlExtractor::new();
    group.bench_function("heuristic_only", |b| {
        b.iter(|| black_box(lenient.extract(Some(&sql))));
    });

    let mut config = Config::default();
    config.extraction.strict_validation = true;
    let strict = SqlExtractor::with_config(config);
    group.bench_function("with_validation", |b| {
        b.iter(|| black_box(strict.extract(Some(&sql))));
    });

    group.finish();
}

/// Benchmark: extraction plus metadata graph output
fn bench_lineage_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("lineage_output");
    let extractor = SqlExtractor::new();
    let thresholds = ConfidenceThresholds::default();
    let sql = generate_query(10, 30);

    group.bench_function("bundle_and_edges", |b| {
        b.iter(|| {
            let extraction =
                extractor.extract_with_origin(Some(&sql), Origin::new("Package.dtsx", "SqlCommand"));
            let bundle = MetadataBundle::new(&extraction.semantics, &extraction.origin, &thresholds);
            black_box((bundle, join_edges(&extraction.semantics)))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_join_scaling,
    bench_projection_scaling,
    bench_strict_validation,
    bench_lineage_output
);
criterion_main!(benches);
