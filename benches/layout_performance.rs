//! Layout Performance Benchmarks
//!
//! Measures block layout and viewport virtualization over synthetic
//! documents.
//!
//! Targets:
//! - Layout (10k blocks): <100ms
//! - Visible slice lookup: <1ms
//!
//! Run with: `cargo bench --bench layout_performance`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use universal_reader::ast::{self, create_empty_document_ast, DocumentAst, DocumentFormat};
use universal_reader::layout::{build_layout, LayoutOptions};
use universal_reader::render::{compute_virtual_slice, ViewportState};

/// Document alternating headings, paragraphs and code blocks
fn synthetic_document(blocks: usize) -> DocumentAst {
    let mut doc = create_empty_document_ast("bench.md", 0, "text/markdown", DocumentFormat::Md, vec![]);
    let children = (0..blocks)
        .map(|i| match i % 10 {
            0 => ast::heading(format!("Chapter {}", i / 10 + 1), 2),
            7 => ast::code_block("fn main() {\n    println!(\"hello\");\n}", Some("rust")),
            _ => ast::paragraph(format!(
                "Paragraph {} of the benchmark document. The quick brown fox jumps over the lazy dog \
                 while the layout engine wraps this sentence across several lines of the page.",
                i
            )),
        })
        .collect();
    doc.sections = vec![ast::section(None, children)];
    doc
}

fn bench_build_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_layout");
    group.measurement_time(Duration::from_secs(10));

    for blocks in [100usize, 1_000, 10_000] {
        let doc = synthetic_document(blocks);
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &doc, |b, doc| {
            let options = LayoutOptions::new(1200.0);
            b.iter(|| black_box(build_layout(black_box(doc), &options)))
        });
    }

    group.finish();
}

fn bench_virtual_slice(c: &mut Criterion) {
    let layout = build_layout(&synthetic_document(10_000), &LayoutOptions::new(1200.0));

    let mut group = c.benchmark_group("virtual_slice");
    group.sample_size(200);

    group.bench_function("middle_of_10k_blocks", |b| {
        let viewport = ViewportState {
            scroll_top: layout.total_height / 2.0,
            ..ViewportState::default()
        };
        b.iter(|| black_box(compute_virtual_slice(black_box(&layout), &viewport)))
    });

    group.finish();
}

criterion_group!(benches, bench_build_layout, bench_virtual_slice);
criterion_main!(benches);
