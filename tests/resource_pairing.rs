//! Allocation pairing over generated programs.
//!
//! Programs nest `let`, conditionals, early returns and record updates over
//! arbitrary-precision integers. Every one must pass the verifier, run in
//! the interpreter without a leak or double release, and agree with a direct
//! evaluation of the source tree.

use proptest::prelude::*;
use sable::prelude::*;

#[derive(Debug, Clone)]
enum Prog {
    /// The integer parameter `x`.
    Param,
    /// `r.total`
    Total,
    /// Innermost `let`-bound value, or `x` outside any `let`.
    Var,
    Num(i64),
    Add(Box<Prog>, Box<Prog>),
    Let(Box<Prog>, Box<Prog>),
    /// `if x < k then a else b`
    If(i64, Box<Prog>, Box<Prog>),
    /// `if x < k then return a else b`
    ReturnIf(i64, Box<Prog>, Box<Prog>),
    /// `{ r with total = a }.total`
    Update(Box<Prog>),
}

fn prog() -> impl Strategy<Value = Prog> {
    let leaf = prop_oneof![
        Just(Prog::Param),
        Just(Prog::Total),
        Just(Prog::Var),
        (-50i64..50).prop_map(Prog::Num),
    ];
    leaf.prop_recursive(5, 48, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Prog::Add(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Prog::Let(Box::new(a), Box::new(b))),
            (-20i64..20, inner.clone(), inner.clone())
                .prop_map(|(k, a, b)| Prog::If(k, Box::new(a), Box::new(b))),
            (-20i64..20, inner.clone(), inner.clone())
                .prop_map(|(k, a, b)| Prog::ReturnIf(k, Box::new(a), Box::new(b))),
            inner.prop_map(|a| Prog::Update(Box::new(a))),
        ]
    })
}

const ACC: &str = "acc";

fn int(name: &str) -> Exp {
    Exp::id(name, Typ::Int)
}

fn lt(k: i64) -> Exp {
    Exp::app(
        "lt_int",
        vec![int("x"), Exp::lit(Lit::num(k), Typ::atom(k))],
        Typ::Bool,
    )
}

fn field(base: Exp) -> Exp {
    Exp::new(ExpKind::Field(Box::new(base), "total".into()), Typ::Int)
}

/// Build the source tree. `bound` says whether a `let` is in scope.
fn build(prog: &Prog, bound: bool) -> Exp {
    match prog {
        Prog::Param => int("x"),
        Prog::Total => field(Exp::id("r", Typ::Id(ACC.into()))),
        Prog::Var if bound => int("v"),
        Prog::Var => int("x"),
        Prog::Num(n) => Exp::lit(Lit::num(*n), Typ::atom(*n)),
        Prog::Add(a, b) => Exp::app("add_int", vec![build(a, bound), build(b, bound)], Typ::Int),
        Prog::Let(init, body) => {
            let init = Exp::new(ExpKind::Cast(Typ::Int, Box::new(build(init, bound))), Typ::Int);
            Exp::let_in("v", init, build(body, true))
        }
        Prog::If(k, a, b) => Exp::if_then_else(lt(*k), build(a, bound), build(b, bound), Typ::Int),
        Prog::ReturnIf(k, a, b) => {
            let ret = Exp::new(ExpKind::Return(Box::new(build(a, bound))), Typ::Int);
            Exp::if_then_else(lt(*k), ret, build(b, bound), Typ::Int)
        }
        Prog::Update(a) => {
            let updated = Exp::new(
                ExpKind::RecordUpdate(
                    Box::new(Exp::id("r", Typ::Id(ACC.into()))),
                    vec![("total".into(), build(a, bound))],
                ),
                Typ::Id(ACC.into()),
            );
            field(updated)
        }
    }
}

/// Direct evaluation; `Err` carries an early return.
fn eval(prog: &Prog, x: i128, total: i128, var: Option<i128>) -> Result<i128, i128> {
    Ok(match prog {
        Prog::Param => x,
        Prog::Total => total,
        Prog::Var => var.unwrap_or(x),
        Prog::Num(n) => i128::from(*n),
        Prog::Add(a, b) => eval(a, x, total, var)? + eval(b, x, total, var)?,
        Prog::Let(init, body) => {
            let v = eval(init, x, total, var)?;
            eval(body, x, total, Some(v))?
        }
        Prog::If(k, a, b) => {
            if x < i128::from(*k) {
                eval(a, x, total, var)?
            } else {
                eval(b, x, total, var)?
            }
        }
        Prog::ReturnIf(k, a, b) => {
            if x < i128::from(*k) {
                return Err(eval(a, x, total, var)?);
            }
            eval(b, x, total, var)?
        }
        Prog::Update(a) => eval(a, x, total, var)?,
    })
}

fn oracle() -> StaticOracle {
    let mut oracle = StaticOracle::new();
    oracle
        .function("add_int", vec![Typ::Int, Typ::Int], Typ::Int)
        .function("lt_int", vec![Typ::Int, Typ::Int], Typ::Bool)
        .function("run", vec![Typ::Int, Typ::Id(ACC.into())], Typ::Int);
    oracle
}

fn defs(body: Exp) -> Vec<Def> {
    vec![
        Def::Struct {
            name: ACC.into(),
            fields: vec![("total".into(), Typ::Int), ("count".into(), Typ::range(0, 100))],
        },
        Def::Function(FunctionDef {
            name: "run".into(),
            params: vec!["x".into(), "r".into()],
            body,
            span: Span::UNKNOWN,
        }),
    ]
}

fn acc(total: i64) -> Value {
    Value::Struct(vec![
        ("total".into(), Value::int(total)),
        ("count".into(), Value::int(0)),
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_generated_programs_pair_allocations(
        prog in prog(),
        x in -30i64..30,
        total in -1000i64..1000,
    ) {
        let oracle = oracle();
        let defs = defs(build(&prog, false));
        let result = sable::compile(&oracle, &defs, CompileOptions::default());
        prop_assert!(result.is_success(), "{:?}", result.errors);

        let expected = match eval(&prog, i128::from(x), i128::from(total), None) {
            Ok(v) | Err(v) => v,
        };
        let mut interp = Interpreter::new(&result.module);
        prop_assert_eq!(
            interp.call("run", vec![Value::int(x), acc(total)]),
            Ok(Value::int(expected))
        );
    }

    #[test]
    fn test_generated_programs_emit_c(prog in prog()) {
        let oracle = oracle();
        let c = sable::compile_to_c(&oracle, &defs(build(&prog, false)), CompileOptions::default());
        prop_assert!(c.is_ok(), "{:?}", c.err());
    }
}

#[test]
fn test_early_return_inside_binding() {
    // let v = x + 1 in (if x < 0 then return v else v + v)
    let prog = Prog::Let(
        Box::new(Prog::Add(Box::new(Prog::Param), Box::new(Prog::Num(1)))),
        Box::new(Prog::ReturnIf(
            0,
            Box::new(Prog::Var),
            Box::new(Prog::Add(Box::new(Prog::Var), Box::new(Prog::Var))),
        )),
    );
    let oracle = oracle();
    let result = sable::compile(&oracle, &defs(build(&prog, false)), CompileOptions::default());
    assert!(result.is_success(), "{:?}", result.errors);

    let mut interp = Interpreter::new(&result.module);
    assert_eq!(interp.call("run", vec![Value::int(-5), acc(0)]), Ok(Value::int(-4)));
    assert_eq!(interp.call("run", vec![Value::int(5), acc(0)]), Ok(Value::int(12)));
}
