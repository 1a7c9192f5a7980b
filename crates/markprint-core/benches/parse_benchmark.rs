//! Benchmarks for document parsing throughput
//!
//! Run with: cargo bench -p markprint-core

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use markprint_core::{parse_source, Config, DocContext};

/// Sample document exercising every block construct
const SAMPLE: &str = r#"# Benchmark Document {#top}

This is a paragraph with *emphasis*, **strong text**, and `inline code`.
It also carries an [external link](https://example.com) and a
cross reference to the [](#top) heading.

## Lists

- First item with some content
- Second item with more content
  - A nested item below it
- Third item concluding the list

1. Step one of the process
2. Step two continues
3. Step three completes

## Code Example

```
fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}
```

## Autonumbering

\\(figure). A numbered caption line

\\(figure). Another numbered caption line

## Table

| Name    | Speed   | Memory |
| ------- | ------- | ------ |
| Fast    | 100ms   | 10MB   |
| Medium  | 500ms   | 50MB   |
| Slow    | 1000ms  | 100MB  |

## Quote

> The best code is no code at all.
> Every line of code you write is a liability.

---

End of document.
"#;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    // Set throughput for bytes/sec reporting
    group.throughput(Throughput::Bytes(SAMPLE.len() as u64));

    group.bench_function("document", |b| {
        b.iter(|| {
            let mut ctx = DocContext::new(Config::default());
            let mut nodes =
                parse_source(black_box(SAMPLE), Path::new("bench.md"), &mut ctx, Default::default())
                    .unwrap();
            ctx.finalize(&mut nodes).unwrap();
            black_box(nodes.len())
        })
    });

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    // Test with different document sizes
    for size in [1, 5, 10, 20].iter() {
        let content: String = SAMPLE.repeat(*size);
        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::new("document", size), &content, |b, content| {
            b.iter(|| {
                let mut ctx = DocContext::new(Config::default());
                let mut nodes =
                    parse_source(black_box(content), Path::new("bench.md"), &mut ctx, Default::default())
                        .unwrap();
                ctx.finalize(&mut nodes).unwrap();
                black_box(nodes.len())
            })
        });
    }

    group.finish();
}

fn bench_inline(c: &mut Criterion) {
    let mut group = c.benchmark_group("inline");

    let inline_heavy = "This has *emphasis*, **strong**, `code`, \
[a link](https://example.com), \\sym{->} symbols, ~~strike~~ text, \
smart \"quotes\" and dashes -- everywhere..."
        .repeat(20);
    let paragraph = format!("{}\n", inline_heavy);
    group.throughput(Throughput::Bytes(paragraph.len() as u64));

    group.bench_function("paragraph", |b| {
        b.iter(|| {
            let mut ctx = DocContext::new(Config::default());
            let nodes =
                parse_source(black_box(&paragraph), Path::new("bench.md"), &mut ctx, Default::default())
                    .unwrap();
            black_box(nodes.len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_scaling, bench_inline);
criterion_main!(benches);
