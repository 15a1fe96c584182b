//! Lexer benchmarks.
//!
//! Run with `cargo bench --package l0c-lex`.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use l0c_lex::Lexer;
use l0c_util::{FileId, Handler};

fn lex_token_count(source: &str) -> usize {
    let handler = Handler::new();
    Lexer::new(source, &handler, FileId::DUMMY).count()
}

fn bench_lexer_simple(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    let source = "let x = 42; func main() -> int { let y = x + 1; return y; }";
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("simple_let", |b| {
        b.iter(|| lex_token_count(black_box("let x = 42;")))
    });

    group.bench_function("function_with_body", |b| {
        b.iter(|| lex_token_count(black_box(source)))
    });

    group.finish();
}

fn bench_lexer_module(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_module");

    let source = r#"
module demo.colors;

import demo.io;

enum Color { Red(); Green(); Blue(); }

struct Pixel {
    x: int;
    y: int;
    color: Color;
}

func brightness(c: Color) -> int {
    match (c) {
        Red() => { return 30; }
        Green() => { return 59; }
        Blue() => { return 11; }
    }
}

func main() -> int {
    let p: Pixel* = new Pixel(0, 0, Red());
    let b = brightness(p.color);
    drop p;
    return b;
}
"#;
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("full_module", |b| {
        b.iter(|| lex_token_count(black_box(source)))
    });

    group.finish();
}

criterion_group!(benches, bench_lexer_simple, bench_lexer_module);
criterion_main!(benches);
