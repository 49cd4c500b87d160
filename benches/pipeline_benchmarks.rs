//! Performance benchmarks for the sable pipeline.
//!
//! Synthetic programs of increasing size, each function a chain of nested
//! `let` bindings over big integers and packed bit-vectors:
//!
//! - `pipeline/compile`: normalization through verification
//! - `pipeline/emit`: the full pipeline including C generation
//! - `pipeline/specialize`: the same program with and without specialization
//!
//! ```bash
//! cargo bench --bench pipeline_benchmarks
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sable::prelude::*;
use std::hint::black_box;

fn num(n: i64) -> Exp {
    Exp::lit(Lit::num(n), Typ::atom(n))
}

fn hex(digits: &str) -> Exp {
    Exp::lit(Lit::Hex(digits.to_string()), Typ::bits(16))
}

/// `depth` nested lets, each adding to the previous binding, ending in a
/// conditional.
fn body(depth: usize) -> Exp {
    let mut exp = Exp::if_then_else(
        Exp::app(
            "lt_int",
            vec![Exp::id(format!("v{depth}"), Typ::Int), num(100)],
            Typ::Bool,
        ),
        Exp::id(format!("v{depth}"), Typ::Int),
        Exp::id("x", Typ::Int),
        Typ::Int,
    );
    for i in (1..=depth).rev() {
        let prev = if i == 1 { "x".to_string() } else { format!("v{}", i - 1) };
        let word = Exp::app("add_vec", vec![hex("FFFF"), hex("0001")], Typ::bits(16));
        let sum = Exp::app(
            "add_int",
            vec![Exp::id(prev, Typ::Int), num(i as i64)],
            Typ::Int,
        );
        exp = Exp::let_in(format!("w{i}"), word, Exp::let_in(format!("v{i}"), sum, exp));
    }
    exp
}

fn program(functions: usize, depth: usize) -> (StaticOracle, Vec<Def>) {
    let mut oracle = StaticOracle::new();
    oracle
        .register("PC", Typ::bits(64))
        .function("add_int", vec![Typ::Int, Typ::Int], Typ::Int)
        .function("lt_int", vec![Typ::Int, Typ::Int], Typ::Bool)
        .function("add_vec", vec![Typ::bits(16), Typ::bits(16)], Typ::bits(16));

    let mut defs = vec![Def::Register { name: "PC".into(), typ: Typ::bits(64) }];
    for f in 0..functions {
        let name = format!("step{f}");
        oracle.function(name.clone(), vec![Typ::Int], Typ::Int);
        defs.push(Def::Function(FunctionDef {
            name,
            params: vec!["x".into()],
            body: body(depth),
            span: Span::UNKNOWN,
        }));
    }
    (oracle, defs)
}

const SIZES: [(usize, usize); 3] = [(1, 8), (16, 16), (64, 32)];

fn compile_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/compile");
    for (functions, depth) in SIZES {
        let (oracle, defs) = program(functions, depth);
        group.throughput(Throughput::Elements(functions as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{functions}x{depth}")),
            &defs,
            |b, defs| {
                b.iter(|| {
                    let result = sable::compile(&oracle, black_box(defs), CompileOptions::default());
                    black_box(result.module.defs.len())
                });
            },
        );
    }
    group.finish();
}

fn emit_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/emit");
    for (functions, depth) in SIZES {
        let (oracle, defs) = program(functions, depth);
        group.throughput(Throughput::Elements(functions as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{functions}x{depth}")),
            &defs,
            |b, defs| {
                b.iter(|| {
                    let c = sable::compile_to_c(&oracle, black_box(defs), CompileOptions::default())
                        .unwrap();
                    black_box(c.len())
                });
            },
        );
    }
    group.finish();
}

fn specialize_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/specialize");
    let (oracle, defs) = program(16, 16);
    for specialize in [true, false] {
        let options = CompileOptions::default().with_specialize(specialize);
        group.bench_function(if specialize { "on" } else { "off" }, |b| {
            b.iter(|| {
                let result = sable::compile(&oracle, black_box(&defs), options);
                black_box(result.errors.len())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    compile_benchmarks,
    emit_benchmarks,
    specialize_benchmarks
);

criterion_main!(benches);
