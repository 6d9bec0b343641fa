//! Criterion benchmarks for placeholder resolution.
//!
//! Run with:
//! ```bash
//! cargo bench --package confman-core --bench resolver_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use confman_core::{resolve, Delimiters, VariableTable};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn table(n: usize) -> VariableTable {
    (0..n)
        .map(|i| (format!("var{i}"), format!("value-{i}")))
        .collect()
}

/// A value containing `n` placeholders separated by literal text.
fn value_with_placeholders(n: usize) -> String {
    (0..n).map(|i| format!("/seg%var{i}%")).collect()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_resolve_no_placeholders(c: &mut Criterion) {
    let vars = table(16);
    let delims = Delimiters::new("%", "%");
    c.bench_function("resolve_plain_value", |b| {
        b.iter(|| resolve(black_box("http://localhost:8080/api/v1"), &vars, &delims))
    });
}

fn bench_resolve_scaling(c: &mut Criterion) {
    let vars = table(64);
    let delims = Delimiters::new("%", "%");
    let mut group = c.benchmark_group("resolve_placeholders");

    for &count in &[1usize, 4, 16, 64] {
        let value = value_with_placeholders(count);
        group.bench_with_input(BenchmarkId::new("placeholders", count), &value, |b, value| {
            b.iter(|| resolve(black_box(value), &vars, &delims))
        });
    }

    group.finish();
}

fn bench_resolve_unbound(c: &mut Criterion) {
    let vars = VariableTable::new();
    let delims = Delimiters::new("${", "}");
    let value: String = (0..16).map(|i| format!("/seg${{var{i}}}")).collect();
    c.bench_function("resolve_unbound_placeholders", |b| {
        b.iter(|| resolve(black_box(&value), &vars, &delims))
    });
}

criterion_group!(
    benches,
    bench_resolve_no_placeholders,
    bench_resolve_scaling,
    bench_resolve_unbound,
);
criterion_main!(benches);
