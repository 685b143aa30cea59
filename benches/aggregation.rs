//! Aggregation Benchmarks
//!
//! Cost of merging per-page outcomes into a document result, and of
//! classifying uploads by signature.
//!
//! Run with: `cargo bench --bench aggregation`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use pagescan_server::document::DocumentKind;
use pagescan_server::ocr::{FailureReason, PageOutcome, TextSource};
use pagescan_server::pipeline::aggregate;

/// Page outcomes with every tenth page timed out
fn outcomes(pages: usize) -> Vec<PageOutcome> {
    (0..pages)
        .map(|index| {
            if index % 10 == 9 {
                PageOutcome::Failed {
                    index,
                    reason: FailureReason::Timeout {
                        limit: Duration::from_secs(60),
                    },
                    attempts: 2,
                }
            } else {
                PageOutcome::Recognized {
                    index,
                    text: "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n".repeat(40),
                    confidence: 0.85,
                    elapsed: Duration::from_millis(900),
                    source: TextSource::Ocr,
                    attempts: 1,
                    words: Vec::new(),
                }
            }
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for pages in [1usize, 50, 500] {
        let input = outcomes(pages);
        group.throughput(Throughput::Elements(pages as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pages), &input, |b, input| {
            b.iter(|| aggregate(black_box(input.clone())))
        });
    }

    group.finish();
}

fn bench_format_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_detection");

    let pdf = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
    let text = b"plain text, not a document".to_vec();

    group.bench_function("pdf_magic_bytes", |b| {
        b.iter(|| DocumentKind::from_magic_bytes(black_box(&pdf)))
    });
    group.bench_function("png_magic_bytes", |b| {
        b.iter(|| DocumentKind::from_magic_bytes(black_box(&png)))
    });
    group.bench_function("unknown_magic_bytes", |b| {
        b.iter(|| DocumentKind::from_magic_bytes(black_box(&text)))
    });

    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_format_detection);
criterion_main!(benches);
