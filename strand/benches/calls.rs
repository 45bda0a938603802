use criterion::{black_box, criterion_group, criterion_main, Criterion};

use strand::prelude::*;

fn criterion_benchmark(c: &mut Criterion) {
    let source_code = include_str!("calls.st");
    let conf = InterpConf {
        arena_size: 1024 * 1024,
        ..InterpConf::default()
    };

    c.bench_function("lex calls", |b| {
        b.iter(|| black_box(TokenStream::from_source(source_code)))
    });

    c.bench_function("run calls", |b| {
        b.iter(|| {
            let mut interp = Interp::new(conf.clone());
            interp.load_source("calls.st", source_code).unwrap();
            let mut out = Vec::new();
            black_box(interp.execute(&mut out))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
