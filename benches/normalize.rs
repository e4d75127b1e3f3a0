//! Benchmarks for the pure pipeline stages.
//!
//! Benchmark targets:
//! - 100-fragment merge: <10ms
//! - Duplicate-heavy merge at 500 fragments: <50ms
//! - Chunking a full chapter: <5ms
//! - ROUGE scoring of a paragraph pair: <1ms

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use suhoc::models::{FragmentNode, FragmentRelationship, GraphFragment};
use suhoc::services::{Chunker, Normalizer, rouge_1, rouge_l};

const LABELS: [&str; 4] = ["Person", "Location", "Event", "Dynasty"];
const NAMES: [&str; 8] = [
    "Trần Hưng Đạo",
    "Thăng Long",
    "Nhà Trần",
    "Kháng chiến chống Nguyên Mông",
    "Lý Thái Tổ",
    "Chiếu dời đô",
    "Hai Bà Trưng",
    "Mê Linh",
];

// ============================================================================
// Input generators
// ============================================================================

/// Fragments over a fixed name pool, so most node records merge into an
/// already-seen entity instead of creating a new one.
fn pooled_fragments(count: usize, nodes_per_fragment: usize) -> Vec<GraphFragment> {
    (0..count)
        .map(|f| {
            let mut fragment = GraphFragment::new(format!("chunk_{f:04}"));
            for n in 0..nodes_per_fragment {
                let pick = (f * 7 + n * 3) % NAMES.len();
                fragment = fragment.with_node(FragmentNode::new(
                    format!("n{n}"),
                    LABELS[pick % LABELS.len()],
                    NAMES[pick],
                ));
            }
            for n in 1..nodes_per_fragment {
                fragment = fragment.with_relationship(FragmentRelationship::new(
                    format!("n{}", n - 1),
                    format!("n{n}"),
                    "liên quan",
                ));
            }
            fragment
        })
        .collect()
}

/// Fragments where every node name is unique, so nothing merges.
fn distinct_fragments(count: usize, nodes_per_fragment: usize) -> Vec<GraphFragment> {
    (0..count)
        .map(|f| {
            let mut fragment = GraphFragment::new(format!("chunk_{f:04}"));
            for n in 0..nodes_per_fragment {
                fragment = fragment.with_node(FragmentNode::new(
                    format!("n{n}"),
                    LABELS[n % LABELS.len()],
                    format!("Nhân vật {f}-{n}"),
                ));
            }
            for n in 1..nodes_per_fragment {
                fragment = fragment.with_relationship(FragmentRelationship::new(
                    format!("n{}", n - 1),
                    format!("n{n}"),
                    "liên quan",
                ));
            }
            fragment
        })
        .collect()
}

/// A chapter-sized document assembled from repeated paragraphs.
fn chapter_text(paragraphs: usize) -> String {
    let paragraph = "Năm 1288, quân dân nhà Trần dưới sự chỉ huy của Trần Hưng Đạo \
        đã đánh tan đạo quân xâm lược trên sông Bạch Đằng. Chiến thắng này chấm dứt \
        tham vọng xâm lược Đại Việt của nhà Nguyên.";
    vec![paragraph; paragraphs].join("\n\n")
}

// ============================================================================
// Normalization benchmarks
// ============================================================================

fn bench_normalize_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_scaling");
    group.measurement_time(Duration::from_secs(5));

    for count in [10usize, 100, 500] {
        let fragments = pooled_fragments(count, 6);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("fragments", count),
            &fragments,
            |b, fragments| {
                b.iter(|| Normalizer::new().normalize(black_box(fragments)));
            },
        );
    }

    group.finish();
}

fn bench_normalize_merge_profiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_merge_profiles");

    let duplicate_heavy = pooled_fragments(200, 6);
    group.bench_function("duplicate_heavy", |b| {
        b.iter(|| Normalizer::new().normalize(black_box(&duplicate_heavy)));
    });

    let all_distinct = distinct_fragments(200, 6);
    group.bench_function("all_distinct", |b| {
        b.iter(|| Normalizer::new().normalize(black_box(&all_distinct)));
    });

    group.finish();
}

// ============================================================================
// Chunking benchmarks
// ============================================================================

fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");

    for paragraphs in [10usize, 50, 200] {
        let text = chapter_text(paragraphs);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("paragraphs", paragraphs),
            &text,
            |b, text| {
                let chunker = Chunker::new(1200, 150);
                b.iter(|| chunker.chunk(black_box(text)));
            },
        );
    }

    group.finish();
}

// ============================================================================
// ROUGE benchmarks
// ============================================================================

fn bench_rouge(c: &mut Criterion) {
    let mut group = c.benchmark_group("rouge");

    let reference = "Chiến thắng Bạch Đằng năm 1288 đã chấm dứt hoàn toàn tham vọng \
        xâm lược Đại Việt của nhà Nguyên, bảo vệ vững chắc nền độc lập dân tộc.";
    let candidate = "Năm 1288, chiến thắng trên sông Bạch Đằng chấm dứt tham vọng \
        xâm lược của nhà Nguyên đối với Đại Việt.";

    group.bench_function("rouge_1", |b| {
        b.iter(|| rouge_1(black_box(reference), black_box(candidate)));
    });

    group.bench_function("rouge_l", |b| {
        b.iter(|| rouge_l(black_box(reference), black_box(candidate)));
    });

    group.finish();
}

// ============================================================================
// Combined benchmark groups
// ============================================================================

criterion_group!(
    benches,
    bench_normalize_scaling,
    bench_normalize_merge_profiles,
    bench_chunking,
    bench_rouge,
);

criterion_main!(benches);
