//! Benchmarks for the hot paths of a compilation.
//!
//! - Decoding a long method body with the instruction cursor
//! - Translating the same body into tokens
//! - Encoding and decoding a program image

extern crate cardinal;

use cardinal::{prelude::*, Result};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const PUBLIC_STATIC: u32 = 0x0016;

/// Discovery sink that ignores everything.
struct Ignore;

impl Discovery for Ignore {
    fn request_callable(&mut self, _callable: &Callable) -> Result<()> {
        Ok(())
    }

    fn request_type(&mut self, _ty: Token) -> Result<()> {
        Ok(())
    }

    fn register_native(&mut self, _name: String, _symbol: String) {}
}

/// `ldarg.0; ldarg.1; add; starg.s 0` repeated, then `ldarg.0; ret`.
fn arithmetic_body(repeats: usize) -> Vec<u8> {
    let mut code = Vec::with_capacity(repeats * 5 + 2);
    for _ in 0..repeats {
        code.extend_from_slice(&[0x02, 0x03, 0x58, 0x10, 0x00]);
    }
    code.extend_from_slice(&[0x02, 0x2A]);
    code
}

fn metadata() -> ProgramMetadata {
    let mut mb = MetadataBuilder::new();
    let object = mb.add_type("System", "Object", TypeFlags::PUBLIC, None);
    let int32 = mb.add_type("System", "Int32", TypeFlags::PUBLIC, Some(object));
    let program = mb.add_type("Bench", "Program", TypeFlags::PUBLIC, Some(object));
    mb.add_method(
        program,
        "Sum",
        PUBLIC_STATIC,
        Some(int32),
        vec![ParamDef::new(int32), ParamDef::new(int32)],
        Some(MethodBody::new(2, true, arithmetic_body(4096))),
    );
    mb.build().unwrap()
}

/// Benchmark walking 16k instructions without translating them.
fn bench_decode(c: &mut Criterion) {
    let code = arithmetic_body(4096);

    c.bench_function("decode_16k_instructions", |b| {
        b.iter(|| {
            let mut stream = InstructionStream::new(black_box(&code));
            let mut count = 0usize;
            while !stream.is_exhausted() {
                count += 1;
                stream.advance().unwrap();
            }
            black_box(count)
        });
    });
}

/// Benchmark translating the same body into tokens.
fn bench_translate(c: &mut Criterion) {
    let metadata = metadata();
    let resolver = TypeResolver::new(&ResolverConfig::new(), &metadata).unwrap();
    let code = arithmetic_body(4096);

    c.bench_function("translate_16k_instructions", |b| {
        b.iter(|| {
            let translation = Translator::new(&resolver, "Bench.Program.Sum")
                .translate(black_box(&code), &mut Ignore)
                .unwrap();
            black_box(translation)
        });
    });
}

/// Benchmark the full closure plus image encoding and decoding.
fn bench_image(c: &mut Criterion) {
    let metadata = metadata();
    let mut compiler =
        Compiler::new(&metadata, ResolverConfig::new(), CompilerOptions::default()).unwrap();
    compiler.add_entry_by_name("Bench.Program", "Sum").unwrap();
    let records = compiler.compile().unwrap().records;
    let bytes = records.to_bytes();

    c.bench_function("image_encode", |b| {
        b.iter(|| black_box(ProgramWriter::new(black_box(&records)).to_bytes()));
    });

    c.bench_function("image_decode", |b| {
        b.iter(|| black_box(ProgramReader::from_bytes(black_box(&bytes)).unwrap()));
    });
}

criterion_group!(benches, bench_decode, bench_translate, bench_image);
criterion_main!(benches);
