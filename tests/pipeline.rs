use sable::prelude::*;

fn function(name: &str, params: &[&str], body: Exp) -> Def {
    Def::Function(FunctionDef {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        span: Span::UNKNOWN,
    })
}

fn num(n: i64) -> Exp {
    Exp::lit(Lit::num(n), Typ::atom(n))
}

fn int(name: &str) -> Exp {
    Exp::id(name, Typ::Int)
}

fn big(exp: Exp) -> Exp {
    Exp::new(ExpKind::Cast(Typ::Int, Box::new(exp)), Typ::Int)
}

fn add(a: Exp, b: Exp) -> Exp {
    Exp::app("add_int", vec![a, b], Typ::Int)
}

fn primitives(oracle: &mut StaticOracle) -> &mut StaticOracle {
    oracle
        .function("add_int", vec![Typ::Int, Typ::Int], Typ::Int)
        .function("lt_int", vec![Typ::Int, Typ::Int], Typ::Bool)
}

fn compile(oracle: &StaticOracle, defs: &[Def]) -> CompiledModule {
    let result = sable::compile(oracle, defs, CompileOptions::default());
    assert!(result.is_success(), "{:?}", result.errors);
    result.module
}

#[test]
fn test_while_loop_sums() {
    // var i = 0; var acc = 0; while i < n { acc = acc + i; i = i + 1 }; acc
    let mut oracle = StaticOracle::new();
    primitives(&mut oracle).function("sum_to", vec![Typ::Int], Typ::Int);

    let cond = Exp::app("lt_int", vec![int("i"), int("n")], Typ::Bool);
    let step = Exp::block(vec![
        Exp::assign("acc", add(int("acc"), int("i"))),
        Exp::assign("i", add(int("i"), num(1))),
    ]);
    let body = Exp::var_in(
        "i",
        big(num(0)),
        Exp::var_in(
            "acc",
            big(num(0)),
            Exp::block(vec![
                Exp::new(ExpKind::Loop(LoopKind::While, Box::new(cond), Box::new(step)), Typ::Unit),
                int("acc"),
            ]),
        ),
    );
    let module = compile(&oracle, &[function("sum_to", &["n"], body)]);

    let mut interp = Interpreter::new(&module);
    assert_eq!(interp.call("sum_to", vec![Value::int(5)]), Ok(Value::int(10)));
    assert_eq!(interp.call("sum_to", vec![Value::int(0)]), Ok(Value::int(0)));
}

#[test]
fn test_counted_loop() {
    // var acc = 0; foreach (k from 1 to 4 by 1 in inc) acc = acc + k; acc
    let mut oracle = StaticOracle::new();
    primitives(&mut oracle).function("tally", vec![], Typ::Int);

    let body = Exp::var_in(
        "acc",
        big(num(0)),
        Exp::block(vec![
            Exp::new(
                ExpKind::For {
                    var: "k".into(),
                    from: Box::new(num(1)),
                    to: Box::new(num(4)),
                    step: Box::new(num(1)),
                    order: Order::Inc,
                    body: Box::new(Exp::assign(
                        "acc",
                        add(int("acc"), Exp::id("k", Typ::range(1, 4))),
                    )),
                },
                Typ::Unit,
            ),
            int("acc"),
        ]),
    );
    let module = compile(&oracle, &[function("tally", &[], body)]);
    assert_eq!(Interpreter::new(&module).call("tally", vec![]), Ok(Value::int(10)));
}

#[test]
fn test_aggregates() {
    let mut oracle = StaticOracle::new();
    oracle
        .enumeration("mode", &["User", "Machine"])
        .constructor("opt", "None", Typ::Unit)
        .constructor("opt", "Some", Typ::Int)
        .function("machine", vec![], Typ::Id("mode".into()))
        .function("wrap", vec![Typ::Int], Typ::Id("opt".into()))
        .function("pair", vec![Typ::Int, Typ::Bool], Typ::Tuple(vec![Typ::Int, Typ::Bool]))
        .function("greeting", vec![], Typ::String);

    let defs = vec![
        Def::Enum { name: "mode".into(), members: vec!["User".into(), "Machine".into()] },
        Def::Union {
            name: "opt".into(),
            ctors: vec![("None".into(), Typ::Unit), ("Some".into(), Typ::Int)],
        },
        function("machine", &[], Exp::id("Machine", Typ::Id("mode".into()))),
        function("wrap", &["x"], Exp::app("Some", vec![int("x")], Typ::Id("opt".into()))),
        function(
            "pair",
            &["a", "b"],
            Exp::new(
                ExpKind::Tuple(vec![int("a"), Exp::id("b", Typ::Bool)]),
                Typ::Tuple(vec![Typ::Int, Typ::Bool]),
            ),
        ),
        function("greeting", &[], Exp::lit(Lit::String("hello".into()), Typ::String)),
    ];
    let module = compile(&oracle, &defs);
    let mut interp = Interpreter::new(&module);

    assert_eq!(interp.call("machine", vec![]), Ok(Value::Enum("Machine".into())));
    assert_eq!(
        interp.call("wrap", vec![Value::int(3)]),
        Ok(Value::Variant("Some".into(), Box::new(Value::int(3))))
    );
    assert_eq!(
        interp.call("pair", vec![Value::int(7), Value::Bool(true)]),
        Ok(Value::Struct(vec![
            ("tup0".into(), Value::int(7)),
            ("tup1".into(), Value::Bool(true)),
        ]))
    );
    assert_eq!(interp.call("greeting", vec![]), Ok(Value::Str("hello".into())));

    assert!(module.function("wrap").unwrap().returns_by_reference());
    assert!(module.function("pair").unwrap().returns_by_reference());
    assert!(!module.function("machine").unwrap().returns_by_reference());
}

#[test]
fn test_emitted_translation_unit() {
    let mut oracle = StaticOracle::new();
    primitives(&mut oracle)
        .register("PC", Typ::bits(64))
        .register("ACC", Typ::Int)
        .function("bump", vec![], Typ::Unit);

    let defs = vec![
        Def::Register { name: "PC".into(), typ: Typ::bits(64) },
        Def::Register { name: "ACC".into(), typ: Typ::Int },
        Def::Struct {
            name: "pair".into(),
            fields: vec![("a".into(), Typ::Int), ("b".into(), Typ::Bool)],
        },
        function("bump", &[], Exp::assign("ACC", add(int("ACC"), num(1)))),
    ];
    let c = sable::compile_to_c(&oracle, &defs, CompileOptions::default()).unwrap();

    assert!(c.starts_with("#include \"sable.h\"\n"));
    assert!(c.contains("struct zpair {"), "{c}");
    assert!(c.contains("fbits zPC;"), "{c}");
    assert!(c.contains("big_int zACC;"), "{c}");
    assert!(c.contains("unit zbump(void)"), "{c}");
    assert!(c.contains("void model_init(void)"), "{c}");
    assert!(c.contains("void model_fini(void)"), "{c}");

    let bare = CompileOptions::default().with_emit(EmitFlags::STATIC_FUNCTIONS);
    let c = sable::compile_to_c(&oracle, &defs, bare).unwrap();
    assert!(c.contains("static unit zbump(void)"), "{c}");
    assert!(!c.contains("model_init"));
}

#[test]
fn test_patterns() {
    let mut oracle = StaticOracle::new();
    primitives(&mut oracle)
        .function("typed", vec![Typ::Int], Typ::Int)
        .function("tuple", vec![], Typ::Unit);

    let typed = Exp::new(
        ExpKind::Let(
            Pat::Typed(Typ::Int, "y".into()),
            Box::new(add(int("x"), num(2))),
            Box::new(Exp::new(
                ExpKind::Let(Pat::Wild, Box::new(add(int("y"), int("y"))), Box::new(int("y"))),
                Typ::Int,
            )),
        ),
        Typ::Int,
    );
    let tuple = Exp::new(
        ExpKind::Let(
            Pat::Tuple(vec![Pat::Id("a".into()), Pat::Id("b".into())]),
            Box::new(Exp::new(
                ExpKind::Tuple(vec![num(1), num(2)]),
                Typ::Tuple(vec![Typ::atom(1), Typ::atom(2)]),
            )),
            Box::new(Exp::lit(Lit::Unit, Typ::Unit)),
        ),
        Typ::Unit,
    );

    let result = sable::compile(
        &oracle,
        &[function("typed", &["x"], typed), function("tuple", &[], tuple)],
        CompileOptions::default(),
    );
    assert!(matches!(
        result.errors.as_slice(),
        [CompilationError::UnsupportedConstruct { .. }]
    ));
    let mut interp = Interpreter::new(&result.module);
    assert_eq!(interp.call("typed", vec![Value::int(40)]), Ok(Value::int(42)));
}

#[test]
fn test_failures_are_reported_together() {
    let mut oracle = StaticOracle::new();
    primitives(&mut oracle)
        .function("lists", vec![], Typ::List(Box::new(Typ::Int)))
        .function("ok", vec![], Typ::Int);

    let defs = vec![
        function("lists", &[], Exp::new(ExpKind::List(vec![]), Typ::List(Box::new(Typ::Int)))),
        function("ghost", &[], Exp::lit(Lit::Unit, Typ::Unit)),
        function("ok", &[], add(num(1), num(2))),
    ];
    let result = sable::compile(&oracle, &defs, CompileOptions::default());
    assert_eq!(result.errors.len(), 2);
    assert!(result.module.function("ok").is_some());

    match sable::compile_to_c(&oracle, &defs, CompileOptions::default()) {
        Err(SableError::Compilation(errors)) => {
            assert_eq!(errors[1], CompilationError::UnknownFunction { name: "ghost".into() });
        }
        Ok(_) => panic!("expected failure"),
    }
}

#[test]
fn test_assertions_reach_the_runtime() {
    let mut oracle = StaticOracle::new();
    primitives(&mut oracle).function("check", vec![Typ::Int], Typ::Unit);

    let body = Exp::new(
        ExpKind::Assert(
            Box::new(Exp::app("lt_int", vec![int("x"), num(10)], Typ::Bool)),
            Box::new(Exp::lit(Lit::String("x too large".into()), Typ::String)),
        ),
        Typ::Unit,
    );
    let module = compile(&oracle, &[function("check", &["x"], body)]);
    let mut interp = Interpreter::new(&module);
    assert_eq!(interp.call("check", vec![Value::int(3)]), Ok(Value::Unit));
    assert_eq!(
        interp.call("check", vec![Value::int(30)]),
        Err(EvalError::AssertionFailed("x too large".into()))
    );
}

#[test]
fn test_verification_can_be_disabled() {
    let mut oracle = StaticOracle::new();
    primitives(&mut oracle).function("inc", vec![Typ::Int], Typ::Int);
    let defs = [function("inc", &["x"], add(int("x"), num(1)))];

    let options = CompileOptions::default().with_verify(false).with_specialize(false);
    let result = sable::compile(&oracle, &defs, options);
    assert!(result.is_success());
    assert_eq!(
        Interpreter::new(&result.module).call("inc", vec![Value::int(1)]),
        Ok(Value::int(2))
    );
}

#[test]
fn test_narrowing_cast_masks_high_bits() {
    let mut oracle = StaticOracle::new();
    oracle.function("low_byte", vec![Typ::bits(32)], Typ::bits(8));
    let body = Exp::new(
        ExpKind::Cast(Typ::bits(8), Box::new(Exp::id("w", Typ::bits(32)))),
        Typ::bits(8),
    );
    let defs = [function("low_byte", &["w"], body)];

    let module = compile(&oracle, &defs);
    assert_eq!(
        Interpreter::new(&module).call("low_byte", vec![Value::bits(0x1234, 32)]),
        Ok(Value::bits(0x34, 8))
    );
    let c = sable::compile_to_c(&oracle, &defs, CompileOptions::default()).unwrap();
    assert!(c.contains("& UINT64_C(0xFF));"), "{c}");
}
