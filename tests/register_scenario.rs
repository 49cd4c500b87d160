//! Field access on a 32-bit register through slicing primitives.
//!
//! `R` is 32 bits wide with a high byte at 15..8 and a low byte at 7..0.

use sable::prelude::*;

fn r() -> Exp {
    Exp::id("R", Typ::bits(32))
}

fn n(value: i64) -> Exp {
    Exp::lit(Lit::num(value), Typ::atom(value))
}

fn subrange(hi: i64, lo: i64) -> Exp {
    Exp::app("vector_subrange", vec![r(), n(hi), n(lo)], Typ::bits(8))
}

fn update(base: Exp, hi: i64, lo: i64, value: Exp) -> Exp {
    Exp::app(
        "vector_update_subrange",
        vec![base, n(hi), n(lo), value],
        Typ::bits(32),
    )
}

fn function(name: &str, params: &[&str], body: Exp) -> Def {
    Def::Function(FunctionDef {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        span: Span::UNKNOWN,
    })
}

fn byte(name: &str) -> Exp {
    Exp::id(name, Typ::bits(8))
}

fn oracle() -> StaticOracle {
    let mut oracle = StaticOracle::new();
    oracle
        .register("R", Typ::bits(32))
        .function(
            "vector_subrange",
            vec![Typ::bits(32), Typ::Int, Typ::Int],
            Typ::bits(8),
        )
        .function(
            "vector_update_subrange",
            vec![Typ::bits(32), Typ::Int, Typ::Int, Typ::bits(8)],
            Typ::bits(32),
        )
        .function("read_high", vec![], Typ::bits(8))
        .function("read_low", vec![], Typ::bits(8))
        .function("write_high", vec![Typ::bits(8)], Typ::Unit)
        .function("write_low", vec![Typ::bits(8)], Typ::Unit)
        .function("write_both", vec![Typ::bits(8), Typ::bits(8)], Typ::Unit);
    oracle
}

fn defs() -> Vec<Def> {
    vec![
        Def::Register { name: "R".into(), typ: Typ::bits(32) },
        function("read_high", &[], subrange(15, 8)),
        function("read_low", &[], subrange(7, 0)),
        function("write_high", &["v"], Exp::assign("R", update(r(), 15, 8, byte("v")))),
        function("write_low", &["v"], Exp::assign("R", update(r(), 7, 0, byte("v")))),
        function(
            "write_both",
            &["h", "l"],
            Exp::assign("R", update(update(r(), 15, 8, byte("h")), 7, 0, byte("l"))),
        ),
    ]
}

fn compile() -> CompiledModule {
    let oracle = oracle();
    let result = sable::compile(&oracle, &defs(), CompileOptions::default());
    assert!(result.is_success(), "{:?}", result.errors);
    result.module
}

fn read(interp: &mut Interpreter<'_>, name: &str) -> u64 {
    interp
        .call(name, vec![])
        .unwrap()
        .as_u64()
        .unwrap()
}

#[test]
fn test_register_is_a_packed_word() {
    let module = compile();
    assert_eq!(
        module.registers().collect::<Vec<_>>(),
        vec![("R", &CTyp::FBits(32, Order::Dec))]
    );
    for function in module.functions() {
        assert!(!function.returns_by_reference(), "{}", function.name);
    }
}

#[test]
fn test_fields_read_back_what_was_written() {
    let module = compile();
    let mut interp = Interpreter::new(&module);

    for value in [0x00, 0xFF] {
        interp.call("write_high", vec![Value::bits(value, 8)]).unwrap();
        interp.call("write_low", vec![Value::bits(value, 8)]).unwrap();
        assert_eq!(read(&mut interp, "read_high"), value);
        assert_eq!(read(&mut interp, "read_low"), value);
    }
}

#[test]
fn test_writing_one_field_leaves_the_other() {
    let module = compile();
    let mut interp = Interpreter::new(&module);

    interp.call("write_low", vec![Value::bits(0x77, 8)]).unwrap();
    assert_eq!(read(&mut interp, "read_low"), 0x77);
    assert_eq!(read(&mut interp, "read_high"), 0x00);
    assert_eq!(interp.register("R"), Some(&Value::bits(0x0077, 32)));
}

#[test]
fn test_combined_write() {
    let module = compile();
    let mut interp = Interpreter::new(&module);

    interp
        .call("write_both", vec![Value::bits(0x47, 8), Value::bits(0x11, 8)])
        .unwrap();
    assert_eq!(read(&mut interp, "read_high"), 0x47);
    assert_eq!(read(&mut interp, "read_low"), 0x11);
}

#[test]
fn test_bits_outside_the_fields_are_preserved() {
    let module = compile();
    let mut interp = Interpreter::new(&module);

    interp.set_register("R", Value::bits(0xDEAD_BEEF, 32)).unwrap();
    interp
        .call("write_both", vec![Value::bits(0x12, 8), Value::bits(0x34, 8)])
        .unwrap();
    assert_eq!(interp.register("R"), Some(&Value::bits(0xDEAD_1234, 32)));
}

#[test]
fn test_register_code_is_emitted() {
    let oracle = oracle();
    let c = sable::compile_to_c(&oracle, &defs(), CompileOptions::default()).unwrap();
    assert!(c.contains("fbits zR;"), "{c}");
    assert!(c.contains("fbits zread_high(void)"), "{c}");
    assert!(c.contains("vector_update_subrange("), "{c}");
}

fn reference_program() -> (StaticOracle, Vec<Def>) {
    let reg = Typ::Ref(Box::new(Typ::bits(32)));
    let mut oracle = oracle();
    oracle
        .function("watch", vec![reg.clone()], Typ::Unit)
        .function("sample", vec![Typ::bits(32)], Typ::Unit)
        .function("same", vec![reg.clone()], reg.clone())
        .function("by_ref", vec![], Typ::Unit)
        .function("by_value", vec![], Typ::Unit)
        .function("handle", vec![], reg.clone());
    let mut defs = defs();
    defs.extend([
        function(
            "by_ref",
            &[],
            Exp::app("watch", vec![Exp::new(ExpKind::Ref("R".into()), reg.clone())], Typ::Unit),
        ),
        function("by_value", &[], Exp::app("sample", vec![r()], Typ::Unit)),
        function("same", &["x"], Exp::id("x", reg.clone())),
        function(
            "handle",
            &[],
            Exp::app("same", vec![Exp::new(ExpKind::Ref("R".into()), reg.clone())], reg),
        ),
    ]);
    (oracle, defs)
}

#[test]
fn test_references_pass_the_register_address() {
    let (oracle, defs) = reference_program();
    let c = sable::compile_to_c(&oracle, &defs, CompileOptions::default()).unwrap();
    assert!(c.contains("watch(&zR);"), "{c}");
    assert!(c.contains("sample(zR);"), "{c}");
    assert!(c.contains("fbits * zsame(fbits * zx)"), "{c}");

    let result = sable::compile(&oracle, &defs, CompileOptions::default());
    let mut interp = Interpreter::new(&result.module);
    assert_eq!(interp.call("handle", vec![]), Ok(Value::Ref("R".into())));
}

#[test]
fn test_references_require_a_register() {
    let mut oracle = oracle();
    oracle.function("local_ref", vec![Typ::bits(8)], Typ::Unit).function(
        "watch",
        vec![Typ::Ref(Box::new(Typ::bits(8)))],
        Typ::Unit,
    );
    let body = Exp::app(
        "watch",
        vec![Exp::new(ExpKind::Ref("v".into()), Typ::Ref(Box::new(Typ::bits(8))))],
        Typ::Unit,
    );
    let result = sable::compile(&oracle, &[function("local_ref", &["v"], body)], CompileOptions::default());
    assert!(matches!(
        result.errors.as_slice(),
        [CompilationError::InvalidReference { name, .. }] if name == "v"
    ));
}
