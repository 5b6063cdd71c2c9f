//! Format benchmark: parser and composer throughput.
//!
//! Target: formatting stays far below the cost of a terminal write

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use termbus::format::{compose, parse, plain_text, AttributeSink};
use termbus::{Attributes, Result};

/// Sink that only counts, so the benchmark measures formatting alone.
struct Counter {
    changes: usize,
}

impl AttributeSink for Counter {
    fn set_attributes(&mut self, _attributes: Attributes) -> Result<()> {
        self.changes += 1;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<usize> {
        Ok(text.len())
    }
}

const SAMPLE: &str =
    "This is *bold*, -italic-, _underlined_, ~reversed~, ~*-all three-*~ and __escaped__";

fn parse_sample(c: &mut Criterion) {
    c.bench_function("parse_sample", |b| b.iter(|| parse(black_box(SAMPLE))));
}

fn parse_plain(c: &mut Criterion) {
    let text = "plain text without markers ".repeat(40);
    c.bench_function("parse_plain_1k", |b| b.iter(|| parse(black_box(&text))));
}

fn parse_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_scaling");
    for repeats in [1, 10, 100] {
        let text = SAMPLE.repeat(repeats);
        group.bench_with_input(BenchmarkId::from_parameter(repeats), &text, |b, text| {
            b.iter(|| parse(black_box(text)));
        });
    }
    group.finish();
}

fn compose_sample(c: &mut Criterion) {
    let ops = parse(SAMPLE);
    c.bench_function("compose_sample", |b| {
        b.iter(|| {
            let mut sink = Counter { changes: 0 };
            let written = compose(&mut sink, black_box(&ops));
            (written.ok(), sink.changes)
        });
    });
}

fn strip_sample(c: &mut Criterion) {
    let ops = parse(SAMPLE);
    c.bench_function("plain_text_sample", |b| b.iter(|| plain_text(black_box(&ops))));
}

criterion_group!(
    benches,
    parse_sample,
    parse_plain,
    parse_scaling,
    compose_sample,
    strip_sample,
);
criterion_main!(benches);
