use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use scad_docsgen_config::Settings;
use scad_docsgen_engine::target::WikiTarget;
use scad_docsgen_engine::{DocsParser, ErrorLog, PageWriter};
mod common;

fn parse(content: &str) -> (DocsParser, ErrorLog) {
    let mut log = ErrorLog::new();
    let mut parser = DocsParser::new(Settings::default(), &mut log);
    let lines: Vec<&str> = content.lines().collect();
    parser.parse_lines(&lines, "bench.scad", &mut log);
    (parser, log)
}

fn bench_parse_library(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    group.sample_size(10);

    for modules in [10, 100, 500] {
        let content = common::generate_library(modules);
        group.bench_with_input(BenchmarkId::new("library", modules), &content, |b, content| {
            b.iter(|| std::hint::black_box(parse(std::hint::black_box(content))));
        });
    }

    group.finish();
}

fn bench_render_pages(c: &mut Criterion) {
    let mut group = c.benchmark_group("pages");
    group.sample_size(10);

    let (parser, _) = parse(&common::generate_library(100));
    let writer = PageWriter::new(parser.document(), parser.xrefs(), &WikiTarget);
    let file = parser.document().files()[0];

    group.bench_function("file_page", |b| {
        b.iter(|| {
            let mut log = ErrorLog::new();
            std::hint::black_box(writer.file_page(file, &mut log));
        });
    });
    group.bench_function("topics_page", |b| {
        b.iter(|| std::hint::black_box(writer.topics_page()));
    });

    group.finish();
}

criterion_group!(benches, bench_parse_library, bench_render_pages);
criterion_main!(benches);
