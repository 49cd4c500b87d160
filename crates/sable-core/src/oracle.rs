//! Queries the backend makes of the type checker.
//!
//! The backend never re-derives types. It asks three things of its
//! collaborators: what a global identifier is, what a function's signature
//! is, and what a symbolic bound evaluates to. [`TypeOracle`] is that seam;
//! [`StaticOracle`] is a table-backed implementation for drivers and tests.

use num_bigint::BigInt;
use rustc_hash::FxHashMap;

use crate::types::{NExp, Typ};

/// Category of an identifier reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdClass {
    /// A `var`-bound local.
    MutableLocal,
    /// A parameter or `let`-bound local.
    ImmutableLocal,
    /// A global register.
    Register,
    /// A member of an enumeration.
    EnumMember,
    /// A constructor of a tagged union.
    UnionCtor,
    /// Nothing is known about the identifier.
    Unresolved,
}

impl IdClass {
    /// Whether assignment to an identifier of this class is allowed.
    pub fn is_assignable(self) -> bool {
        matches!(self, IdClass::MutableLocal | IdClass::Register)
    }
}

/// Parameter and return types of a call target.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Typ>,
    pub ret: Typ,
}

impl Signature {
    pub fn new(params: Vec<Typ>, ret: Typ) -> Self {
        Self { params, ret }
    }
}

/// Answers the backend's questions about the checked program.
pub trait TypeOracle {
    /// Classify a global identifier and give its type.
    ///
    /// Locals are tracked by the backend itself; this is only asked about
    /// names that are not lexically bound.
    fn global(&self, name: &str) -> Option<(IdClass, Typ)>;

    /// Signature of a call target.
    fn signature(&self, name: &str) -> Option<Signature>;

    /// Reduce a symbolic bound to a constant, if statically determinable.
    fn simplify(&self, nexp: &NExp) -> Option<BigInt> {
        nexp.fold()
    }
}

/// Table-backed oracle.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    globals: FxHashMap<String, (IdClass, Typ)>,
    signatures: FxHashMap<String, Signature>,
    sizes: FxHashMap<String, BigInt>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a register.
    pub fn register(&mut self, name: impl Into<String>, typ: Typ) -> &mut Self {
        self.globals.insert(name.into(), (IdClass::Register, typ));
        self
    }

    /// Declare the members of an enumeration.
    pub fn enumeration(&mut self, name: &str, members: &[&str]) -> &mut Self {
        for member in members {
            self.globals.insert(
                member.to_string(),
                (IdClass::EnumMember, Typ::Id(name.to_string())),
            );
        }
        self
    }

    /// Declare a union constructor and its payload type.
    pub fn constructor(&mut self, union: &str, ctor: &str, payload: Typ) -> &mut Self {
        self.globals.insert(
            ctor.to_string(),
            (IdClass::UnionCtor, Typ::Id(union.to_string())),
        );
        self.signatures.insert(
            ctor.to_string(),
            Signature::new(vec![payload], Typ::Id(union.to_string())),
        );
        self
    }

    /// Declare a function signature.
    pub fn function(&mut self, name: impl Into<String>, params: Vec<Typ>, ret: Typ) -> &mut Self {
        self.signatures
            .insert(name.into(), Signature::new(params, ret));
        self
    }

    /// Fix the value of a size variable for bound simplification.
    pub fn size(&mut self, var: impl Into<String>, value: i64) -> &mut Self {
        self.sizes.insert(var.into(), BigInt::from(value));
        self
    }

    fn eval(&self, nexp: &NExp) -> Option<BigInt> {
        match nexp {
            NExp::Const(n) => Some(n.clone()),
            NExp::Var(v) => self.sizes.get(v).cloned(),
            NExp::Add(a, b) => Some(self.eval(a)? + self.eval(b)?),
            NExp::Sub(a, b) => Some(self.eval(a)? - self.eval(b)?),
            NExp::Mul(a, b) => Some(self.eval(a)? * self.eval(b)?),
            NExp::Neg(a) => Some(-self.eval(a)?),
            NExp::Pow2(a) => {
                let exp = u32::try_from(self.eval(a)?).ok()?;
                Some(BigInt::from(1) << exp)
            }
        }
    }
}

impl TypeOracle for StaticOracle {
    fn global(&self, name: &str) -> Option<(IdClass, Typ)> {
        self.globals.get(name).cloned()
    }

    fn signature(&self, name: &str) -> Option<Signature> {
        self.signatures.get(name).cloned()
    }

    fn simplify(&self, nexp: &NExp) -> Option<BigInt> {
        self.eval(nexp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_are_classified() {
        let mut oracle = StaticOracle::new();
        oracle
            .register("PC", Typ::bits(64))
            .enumeration("mode", &["User", "Machine"]);

        assert_eq!(oracle.global("PC").map(|g| g.0), Some(IdClass::Register));
        assert_eq!(
            oracle.global("Machine"),
            Some((IdClass::EnumMember, Typ::Id("mode".into())))
        );
        assert!(oracle.global("x").is_none());
    }

    #[test]
    fn constructors_get_signatures() {
        let mut oracle = StaticOracle::new();
        oracle.constructor("ast", "NOP", Typ::Unit);
        let sig = oracle.signature("NOP").unwrap();
        assert_eq!(sig.params, vec![Typ::Unit]);
        assert_eq!(sig.ret, Typ::Id("ast".into()));
    }

    #[test]
    fn simplify_uses_fixed_sizes() {
        let mut oracle = StaticOracle::new();
        oracle.size("xlen", 64);
        let n = NExp::Sub(Box::new(NExp::Var("xlen".into())), Box::new(NExp::int(1)));
        assert_eq!(oracle.simplify(&n), Some(BigInt::from(63)));
        assert_eq!(oracle.simplify(&NExp::Var("n".into())), None);
    }

    #[test]
    fn assignable_classes() {
        assert!(IdClass::MutableLocal.is_assignable());
        assert!(IdClass::Register.is_assignable());
        assert!(!IdClass::ImmutableLocal.is_assignable());
        assert!(!IdClass::EnumMember.is_assignable());
    }
}
