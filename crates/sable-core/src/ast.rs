//! The checked expression tree consumed by the backend.
//!
//! Every node carries its resolved type and a span. The tree is produced and
//! owned upstream; the backend only reads it. Some node kinds exist solely
//! because upstream passes are expected to remove them before the backend
//! runs (exception handlers, raw vector mutation, size expressions,
//! nondeterministic choice); the normalizer rejects them.

use num_bigint::BigInt;

use crate::Span;
use crate::types::{Order, Typ};

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lit {
    /// `()`
    Unit,
    /// `true` / `false`
    Bool(bool),
    /// `bitzero` / `bitone`
    Bit(bool),
    /// Integer literal.
    Num(BigInt),
    /// Hexadecimal bit-vector literal, digits only (`"FF"`).
    Hex(String),
    /// Binary bit-vector literal, digits only (`"0101"`).
    Bin(String),
    /// String literal.
    String(String),
    /// `undefined` of the node's type.
    Undefined,
}

impl Lit {
    /// Integer literal shorthand.
    pub fn num(value: i64) -> Self {
        Lit::Num(BigInt::from(value))
    }
}

/// Loop kinds for condition-controlled loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// Test the condition before each iteration.
    While,
    /// Run the body, then stop once the condition holds.
    Until,
}

/// A binding pattern in `let` / `var`.
#[derive(Debug, Clone, PartialEq)]
pub enum Pat {
    /// Bind an identifier.
    Id(String),
    /// Bind an identifier at an annotated type.
    Typed(Typ, String),
    /// Discard the value.
    Wild,
    /// Destructure a tuple.
    Tuple(Vec<Pat>),
}

/// Assignment targets.
#[derive(Debug, Clone, PartialEq)]
pub enum LExp {
    /// Plain identifier.
    Id(String),
    /// `v[i] = ...`
    VectorElem(String, Box<Exp>),
    /// `v[hi .. lo] = ...`
    VectorRange(String, Box<Exp>, Box<Exp>),
    /// `v := v @ ...`
    VectorAppend(String, Box<Exp>),
}

/// A checked expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Exp {
    /// Node kind.
    pub kind: ExpKind,
    /// Resolved type of the node.
    pub typ: Typ,
    /// Source position.
    pub span: Span,
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpKind {
    Lit(Lit),
    Id(String),
    /// Address of an identifier (passed to functions taking references).
    Ref(String),
    Block(Vec<Exp>),
    If(Box<Exp>, Box<Exp>, Box<Exp>),
    Loop(LoopKind, Box<Exp>, Box<Exp>),
    /// Counted loop: `foreach (var from from to to by step in order) body`.
    For {
        var: String,
        from: Box<Exp>,
        to: Box<Exp>,
        step: Box<Exp>,
        order: Order,
        body: Box<Exp>,
    },
    App(String, Vec<Exp>),
    Tuple(Vec<Exp>),
    List(Vec<Exp>),
    Vector(Vec<Exp>),
    Field(Box<Exp>, String),
    RecordUpdate(Box<Exp>, Vec<(String, Exp)>),
    Assign(LExp, Box<Exp>),
    /// Immutable local binding.
    Let(Pat, Box<Exp>, Box<Exp>),
    /// Scoped mutable binding.
    Var(LExp, Box<Exp>, Box<Exp>),
    Cast(Typ, Box<Exp>),
    Throw(Box<Exp>),
    Exit(Box<Exp>),
    Return(Box<Exp>),
    Assert(Box<Exp>, Box<Exp>),
    Cons(Box<Exp>, Box<Exp>),

    // Forms that upstream passes remove before the backend runs.
    Try(Box<Exp>, Vec<(Pat, Exp)>),
    VectorAccess(Box<Exp>, Box<Exp>),
    VectorSubrange(Box<Exp>, Box<Exp>, Box<Exp>),
    VectorUpdate(Box<Exp>, Box<Exp>, Box<Exp>),
    VectorAppend(Box<Exp>, Box<Exp>),
    /// Interpreter-only placeholder.
    InternalValue(String),
    /// `sizeof(n)` that was not rewritten to a value.
    Sizeof(crate::types::NExp),
    /// `constraint(...)` that was not rewritten to a value.
    Constraint(String),
    /// Nondeterministic choice between the blocks.
    Nondet(Vec<Exp>),
}

impl Exp {
    /// Build a node with an unknown span.
    pub fn new(kind: ExpKind, typ: Typ) -> Self {
        Self {
            kind,
            typ,
            span: Span::UNKNOWN,
        }
    }

    /// Attach a span.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Literal node.
    pub fn lit(lit: Lit, typ: Typ) -> Self {
        Self::new(ExpKind::Lit(lit), typ)
    }

    /// Identifier reference.
    pub fn id(name: impl Into<String>, typ: Typ) -> Self {
        Self::new(ExpKind::Id(name.into()), typ)
    }

    /// Function application.
    pub fn app(f: impl Into<String>, args: Vec<Exp>, typ: Typ) -> Self {
        Self::new(ExpKind::App(f.into(), args), typ)
    }

    /// Sequencing block; the type is the final element's.
    pub fn block(exps: Vec<Exp>) -> Self {
        let typ = exps.last().map(|e| e.typ.clone()).unwrap_or(Typ::Unit);
        Self::new(ExpKind::Block(exps), typ)
    }

    /// Immutable binding of `name`; the type is the body's.
    pub fn let_in(name: impl Into<String>, init: Exp, body: Exp) -> Self {
        let typ = body.typ.clone();
        Self::new(
            ExpKind::Let(Pat::Id(name.into()), Box::new(init), Box::new(body)),
            typ,
        )
    }

    /// Scoped mutable binding of `name`; the type is the body's.
    pub fn var_in(name: impl Into<String>, init: Exp, body: Exp) -> Self {
        let typ = body.typ.clone();
        Self::new(
            ExpKind::Var(LExp::Id(name.into()), Box::new(init), Box::new(body)),
            typ,
        )
    }

    /// Conditional at the given result type.
    pub fn if_then_else(cond: Exp, then: Exp, els: Exp, typ: Typ) -> Self {
        Self::new(
            ExpKind::If(Box::new(cond), Box::new(then), Box::new(els)),
            typ,
        )
    }

    /// Assignment to a plain identifier.
    pub fn assign(name: impl Into<String>, value: Exp) -> Self {
        Self::new(
            ExpKind::Assign(LExp::Id(name.into()), Box::new(value)),
            Typ::Unit,
        )
    }
}

/// A top-level function definition.
///
/// Parameter and return types are not repeated here; they come from the
/// signature oracle under the function's name.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Exp,
    pub span: Span,
}

/// A top-level definition, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Def {
    Register { name: String, typ: Typ },
    Function(FunctionDef),
    Struct { name: String, fields: Vec<(String, Typ)> },
    Enum { name: String, members: Vec<String> },
    Union { name: String, ctors: Vec<(String, Typ)> },
}

impl Def {
    /// Name introduced by the definition.
    pub fn name(&self) -> &str {
        match self {
            Def::Register { name, .. }
            | Def::Struct { name, .. }
            | Def::Enum { name, .. }
            | Def::Union { name, .. } => name,
            Def::Function(f) => &f.name,
        }
    }
}
