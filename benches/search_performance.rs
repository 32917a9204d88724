//! Search Performance Benchmarks
//!
//! Full-text search over laid-out blocks and over the raw AST.
//!
//! Targets:
//! - Layout search (10k blocks): <50ms
//!
//! Run with: `cargo bench --bench search_performance`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

use universal_reader::ast::{self, create_empty_document_ast, DocumentAst, DocumentFormat};
use universal_reader::layout::{build_layout, LayoutOptions};
use universal_reader::search::{build_excerpt, search_ast, search_layout_blocks, EXCERPT_RADIUS};

fn searchable_document(blocks: usize) -> DocumentAst {
    let mut doc = create_empty_document_ast("bench.txt", 0, "text/plain", DocumentFormat::Txt, vec![]);
    let children = (0..blocks)
        .map(|i| {
            let keyword = if i % 25 == 0 { "benchmark" } else { "filler" };
            ast::paragraph(format!(
                "Line {} carries some {} text so that matches are sparse but present throughout.",
                i, keyword
            ))
        })
        .collect();
    doc.sections = vec![ast::section(None, children)];
    doc
}

fn bench_layout_search(c: &mut Criterion) {
    let layout = build_layout(&searchable_document(10_000), &LayoutOptions::new(1200.0));

    let mut group = c.benchmark_group("layout_search");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(50);

    group.bench_function("sparse_hits_10k_blocks", |b| {
        b.iter(|| black_box(search_layout_blocks(&layout.blocks, black_box("Benchmark"))))
    });

    group.bench_function("no_hits_10k_blocks", |b| {
        b.iter(|| black_box(search_layout_blocks(&layout.blocks, black_box("absent"))))
    });

    group.finish();
}

fn bench_ast_search(c: &mut Criterion) {
    let doc = searchable_document(10_000);

    let mut group = c.benchmark_group("ast_search");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("sparse_hits_10k_blocks", |b| {
        b.iter(|| black_box(search_ast(&doc, black_box("benchmark"))))
    });

    group.finish();
}

fn bench_excerpt(c: &mut Criterion) {
    let content = "lorem ipsum ".repeat(400) + "needle" + &" dolor sit".repeat(400);

    c.bench_function("excerpt_long_block", |b| {
        b.iter(|| black_box(build_excerpt(black_box(&content), "needle", EXCERPT_RADIUS)))
    });
}

criterion_group!(benches, bench_layout_search, bench_ast_search, bench_excerpt);
criterion_main!(benches);
