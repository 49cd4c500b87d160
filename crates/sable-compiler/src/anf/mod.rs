//! A-normal form.
//!
//! In ANF every argument position holds a trivial value ([`AVal`]): a
//! literal, a name, an aggregate of trivial values, or a fragment. Compound
//! computations ([`AExp`]) only appear where their result is bound, returned
//! or branched on. The [`Normalizer`] produces this form from the checked
//! tree; the specializer and the lowering pass consume it.

mod normalize;
mod pretty;
pub mod scope;

pub use normalize::Normalizer;
pub use scope::LocalEnv;

use sable_core::{IdClass, Lit, LoopKind, Order, Typ};

use crate::fragment::Fragment;

/// Names of the builtins that effectful source forms desugar to.
pub mod builtins {
    /// `throw e`
    pub const THROW: &str = "throw";
    /// `exit(e)`
    pub const EXIT: &str = "exit";
    /// `assert(cond, message)`
    pub const ASSERT: &str = "assert";
    /// `x :: xs`
    pub const CONS: &str = "cons";

    /// Whether a callee is one of the desugaring targets.
    pub fn is_builtin(name: &str) -> bool {
        matches!(name, THROW | EXIT | ASSERT | CONS)
    }
}

/// A trivial value.
#[derive(Debug, Clone, PartialEq)]
pub enum AVal {
    Lit(Lit, Typ),
    /// An identifier with its classification and type.
    Id(String, IdClass, Typ),
    /// Address of a register, typed as a reference to it.
    Ref(String, Typ),
    Tuple(Vec<AVal>),
    List(Vec<AVal>, Typ),
    Vector(Vec<AVal>, Typ),
    /// A precomputed fragment.
    Frag(Fragment, Typ),
}

impl AVal {
    /// Type of the value.
    pub fn typ(&self) -> Typ {
        match self {
            AVal::Lit(_, typ)
            | AVal::Id(_, _, typ)
            | AVal::Ref(_, typ)
            | AVal::List(_, typ)
            | AVal::Vector(_, typ)
            | AVal::Frag(_, typ) => typ.clone(),
            AVal::Tuple(elems) => Typ::Tuple(elems.iter().map(AVal::typ).collect()),
        }
    }

    /// Unit literal.
    pub fn unit() -> Self {
        AVal::Lit(Lit::Unit, Typ::Unit)
    }
}

/// A computation in A-normal form.
#[derive(Debug, Clone, PartialEq)]
pub enum AExp {
    Val(AVal),
    /// Function application: callee, arguments, result type.
    App(String, Vec<AVal>, Typ),
    Cast(Box<AExp>, Typ),
    /// Assignment to a mutable local or register: target, its type, value.
    Assign(String, Typ, Box<AExp>),
    /// `let id : typ = init in body`, with the body's type.
    Let(String, Typ, Box<AExp>, Box<AExp>, Typ),
    /// Statements run for effect, then the final expression.
    Block(Vec<AExp>, Box<AExp>, Typ),
    Return(AVal, Typ),
    If(AVal, Box<AExp>, Box<AExp>, Typ),
    Field(AVal, String, Typ),
    RecordUpdate(AVal, Vec<(String, AVal)>, Typ),
    For {
        var: String,
        from: AVal,
        to: AVal,
        step: AVal,
        order: Order,
        body: Box<AExp>,
    },
    Loop(LoopKind, Box<AExp>, Box<AExp>),
}

impl AExp {
    /// Type of the value the computation produces.
    pub fn typ(&self) -> Typ {
        match self {
            AExp::Val(v) => v.typ(),
            AExp::App(_, _, typ)
            | AExp::Cast(_, typ)
            | AExp::Let(_, _, _, _, typ)
            | AExp::Block(_, _, typ)
            | AExp::Return(_, typ)
            | AExp::If(_, _, _, typ)
            | AExp::Field(_, _, typ)
            | AExp::RecordUpdate(_, _, typ) => typ.clone(),
            AExp::Assign(..) | AExp::For { .. } | AExp::Loop(..) => Typ::Unit,
        }
    }
}
