//! Selector parsing and evaluation benchmarks
//!
//! Measures:
//! - Parsing cost of representative selectors
//! - Evaluation over documents of growing size (cached compilation)
//! - Predicate-heavy selectors using the document functions
//!
//! Run benchmarks: `cargo bench --bench selector_eval`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use nodesel::{Document, SelectorEngine, Tag, Variables, parse_selector};
use std::hint::black_box;

const SELECTORS: [&str; 4] = [
    "//paragraph[1]/word",
    "//word[hasTag('KEYWORD') and @confidence > 0.4]",
    "count(//word) + sum(//paragraph/@index)",
    "//paragraph stream word[last()]",
];

/// `document > chapter* > paragraph* > word*`, every third word tagged.
fn build_document(chapters: usize, width: usize) -> Document {
    let mut doc = Document::new();
    let root = doc.create_root("document", None).expect("root");
    for c in 0..chapters {
        let chapter = doc.add_child(root, "chapter", None).expect("chapter");
        for p in 0..width {
            let paragraph = doc.add_child(chapter, "paragraph", None).expect("paragraph");
            for w in 0..width {
                let word = doc
                    .add_child(paragraph, "word", Some(&format!("w{c}-{p}-{w}")))
                    .expect("word");
                if w % 3 == 0 {
                    doc.tag(word, "KEYWORD", Tag::new().with_confidence(0.5))
                        .expect("tag");
                }
            }
        }
    }
    doc
}

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_parse");
    for (i, selector) in SELECTORS.iter().enumerate() {
        group.bench_with_input(BenchmarkId::new("selector", i), selector, |b, selector| {
            b.iter(|| parse_selector(black_box(selector)).expect("Failed to parse selector"));
        });
    }
    group.finish();
}

fn benchmark_descendant_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_descendant_scan");
    let engine = SelectorEngine::default();
    let vars = Variables::new();

    for width in [4, 8, 16] {
        let doc = build_document(4, width);
        group.throughput(Throughput::Elements(doc.len() as u64));
        group.bench_with_input(BenchmarkId::new("width", width), &doc, |b, doc| {
            b.iter(|| {
                engine
                    .select(doc, black_box("//word"), &vars)
                    .expect("Failed to select")
                    .len()
            });
        });
    }
    group.finish();
}

fn benchmark_predicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_predicates");
    let engine = SelectorEngine::default();
    let vars = Variables::new();
    let doc = build_document(4, 8);

    for (i, selector) in SELECTORS.iter().enumerate() {
        group.bench_with_input(BenchmarkId::new("selector", i), selector, |b, selector| {
            b.iter(|| {
                engine
                    .evaluate(&doc, black_box(selector), &vars)
                    .expect("Failed to evaluate")
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_parse,
    benchmark_descendant_scan,
    benchmark_predicates
);
criterion_main!(benches);
