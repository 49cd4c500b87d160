//! Primitive specialization observed end to end.

use sable::prelude::*;

fn hex(digits: &str, width: i64) -> Exp {
    Exp::lit(Lit::Hex(digits.to_string()), Typ::bits(width))
}

fn function(name: &str, params: &[&str], body: Exp) -> Def {
    Def::Function(FunctionDef {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        span: Span::UNKNOWN,
    })
}

fn run(oracle: &StaticOracle, defs: &[Def], specialize: bool, name: &str, args: Vec<Value>) -> Value {
    let options = CompileOptions::default().with_specialize(specialize);
    let result = sable::compile(oracle, defs, options);
    assert!(result.is_success(), "{:?}", result.errors);
    Interpreter::new(&result.module).call(name, args).unwrap()
}

fn c(oracle: &StaticOracle, defs: &[Def], specialize: bool) -> String {
    let options = CompileOptions::default().with_specialize(specialize);
    sable::compile_to_c(oracle, defs, options).unwrap()
}

fn mask_program() -> (StaticOracle, Vec<Def>) {
    let mut oracle = StaticOracle::new();
    oracle
        .function("xor_vec", vec![Typ::bits(8), Typ::bits(8)], Typ::bits(8))
        .function("mask8", vec![], Typ::bits(8));
    let body = Exp::app("xor_vec", vec![hex("F0", 8), hex("0F", 8)], Typ::bits(8));
    (oracle, vec![function("mask8", &[], body)])
}

#[test]
fn test_eight_bit_mask() {
    let (oracle, defs) = mask_program();
    assert_eq!(run(&oracle, &defs, true, "mask8", vec![]), Value::bits(0xFF, 8));
    assert_eq!(run(&oracle, &defs, false, "mask8", vec![]), Value::bits(0xFF, 8));
}

#[test]
fn test_specialized_call_disappears() {
    let (oracle, defs) = mask_program();
    assert!(c(&oracle, &defs, false).contains("xor_vec("));
    assert!(!c(&oracle, &defs, true).contains("xor_vec("));
}

#[test]
fn test_sixteen_bit_addition_wraps() {
    let mut oracle = StaticOracle::new();
    oracle
        .function("add_vec", vec![Typ::bits(16), Typ::bits(16)], Typ::bits(16))
        .function("wrap", vec![], Typ::bits(16))
        .function("carry", vec![], Typ::bits(16));
    let defs = vec![
        function(
            "wrap",
            &[],
            Exp::app("add_vec", vec![hex("FFFF", 16), hex("0001", 16)], Typ::bits(16)),
        ),
        function(
            "carry",
            &[],
            Exp::app("add_vec", vec![hex("FFFF", 16), hex("0003", 16)], Typ::bits(16)),
        ),
    ];
    for specialize in [true, false] {
        assert_eq!(run(&oracle, &defs, specialize, "wrap", vec![]), Value::bits(0, 16));
        assert_eq!(run(&oracle, &defs, specialize, "carry", vec![]), Value::bits(2, 16));
    }
}

#[test]
fn test_ranges_fold_into_machine_integers() {
    let mut oracle = StaticOracle::new();
    oracle
        .function("add_range", vec![Typ::range(0, 10), Typ::range(0, 10)], Typ::range(0, 20))
        .function("sum", vec![], Typ::range(0, 20));
    let n = |v: i64| Exp::lit(Lit::num(v), Typ::atom(v));
    let defs = vec![function(
        "sum",
        &[],
        Exp::app("add_range", vec![n(7), n(9)], Typ::range(0, 20)),
    )];

    assert_eq!(run(&oracle, &defs, true, "sum", vec![]), Value::int(16));
    assert_eq!(run(&oracle, &defs, false, "sum", vec![]), Value::int(16));
    assert!(!c(&oracle, &defs, true).contains("add_range("));
}

#[test]
fn test_variables_are_not_specialized() {
    let mut oracle = StaticOracle::new();
    oracle
        .function("xor_vec", vec![Typ::bits(8), Typ::bits(8)], Typ::bits(8))
        .function("flip", vec![Typ::bits(8)], Typ::bits(8));
    let body = Exp::app(
        "xor_vec",
        vec![Exp::id("x", Typ::bits(8)), hex("FF", 8)],
        Typ::bits(8),
    );
    let defs = vec![function("flip", &["x"], body)];

    assert!(c(&oracle, &defs, true).contains("xor_vec("));
    assert_eq!(
        run(&oracle, &defs, true, "flip", vec![Value::bits(0x0F, 8)]),
        Value::bits(0xF0, 8)
    );
}

#[test]
fn test_nested_calls_fuse_into_one_fragment() {
    // add_atom(add_atom(1, 2), 4)
    let mut oracle = StaticOracle::new();
    oracle
        .function("add_atom", vec![Typ::Int, Typ::Int], Typ::Int)
        .function("seven", vec![], Typ::atom(7));
    let n = |v: i64| Exp::lit(Lit::num(v), Typ::atom(v));
    let inner = Exp::app("add_atom", vec![n(1), n(2)], Typ::atom(3));
    let defs = vec![function(
        "seven",
        &[],
        Exp::app("add_atom", vec![inner, n(4)], Typ::atom(7)),
    )];

    let code = c(&oracle, &defs, true);
    assert!(!code.contains("add_atom("), "{code}");
    assert!(code.contains("((INT64_C(1) + INT64_C(2)) + INT64_C(4))"), "{code}");
    assert_eq!(run(&oracle, &defs, true, "seven", vec![]), Value::int(7));
    assert_eq!(run(&oracle, &defs, false, "seven", vec![]), Value::int(7));
}
