//! Resolved source types, as produced by the type checker.
//!
//! These are the types the backend is handed; they are never inferred here.
//! Sizes and bounds are symbolic numeric expressions ([`NExp`]) that the
//! oracle's bound simplifier reduces to constants where it can.

use std::fmt;

use num_bigint::BigInt;

/// Bit ordering of a bit-vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// Most significant bit has the highest index.
    Dec,
    /// Most significant bit has index zero.
    Inc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Dec => write!(f, "dec"),
            Order::Inc => write!(f, "inc"),
        }
    }
}

/// A symbolic numeric expression appearing in sizes and bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NExp {
    /// Integer constant.
    Const(BigInt),
    /// Size variable bound by a quantifier.
    Var(String),
    /// Sum.
    Add(Box<NExp>, Box<NExp>),
    /// Difference.
    Sub(Box<NExp>, Box<NExp>),
    /// Product.
    Mul(Box<NExp>, Box<NExp>),
    /// Negation.
    Neg(Box<NExp>),
    /// Two to the power of the operand.
    Pow2(Box<NExp>),
}

impl NExp {
    /// Constant shorthand.
    pub fn int(value: i64) -> Self {
        NExp::Const(BigInt::from(value))
    }

    /// Fold the expression to a constant if it contains no variables.
    pub fn fold(&self) -> Option<BigInt> {
        match self {
            NExp::Const(n) => Some(n.clone()),
            NExp::Var(_) => None,
            NExp::Add(a, b) => Some(a.fold()? + b.fold()?),
            NExp::Sub(a, b) => Some(a.fold()? - b.fold()?),
            NExp::Mul(a, b) => Some(a.fold()? * b.fold()?),
            NExp::Neg(a) => Some(-a.fold()?),
            NExp::Pow2(a) => {
                let exp = u32::try_from(a.fold()?).ok()?;
                Some(BigInt::from(1) << exp)
            }
        }
    }
}

impl fmt::Display for NExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NExp::Const(n) => write!(f, "{n}"),
            NExp::Var(v) => write!(f, "'{v}"),
            NExp::Add(a, b) => write!(f, "({a} + {b})"),
            NExp::Sub(a, b) => write!(f, "({a} - {b})"),
            NExp::Mul(a, b) => write!(f, "({a} * {b})"),
            NExp::Neg(a) => write!(f, "-{a}"),
            NExp::Pow2(a) => write!(f, "2^{a}"),
        }
    }
}

/// A fully resolved source type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Typ {
    /// The unit type.
    Unit,
    /// A single bit.
    Bit,
    /// Booleans.
    Bool,
    /// String literals.
    String,
    /// Unbounded integers.
    Int,
    /// Integers in the closed range `[lo, hi]`.
    Range(NExp, NExp),
    /// The singleton integer type.
    Atom(NExp),
    /// Bit-vector of the given length and ordering.
    Bits(NExp, Order),
    /// Vector of a non-bit element type.
    Vector(NExp, Order, Box<Typ>),
    /// Immutable lists.
    List(Box<Typ>),
    /// Tuples.
    Tuple(Vec<Typ>),
    /// A named struct, enum or union.
    Id(String),
    /// A type abbreviation that was not expanded.
    Abbrev(String),
    /// A bitfield register type that was not lowered.
    Bitfield(String),
    /// Reference to a register of the inner type.
    Ref(Box<Typ>),
}

impl Typ {
    /// Bit-vector of a constant length, decreasing order.
    pub fn bits(len: i64) -> Self {
        Typ::Bits(NExp::int(len), Order::Dec)
    }

    /// Range with constant bounds.
    pub fn range(lo: i64, hi: i64) -> Self {
        Typ::Range(NExp::int(lo), NExp::int(hi))
    }

    /// Singleton integer type.
    pub fn atom(value: i64) -> Self {
        Typ::Atom(NExp::int(value))
    }
}

impl fmt::Display for Typ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typ::Unit => write!(f, "unit"),
            Typ::Bit => write!(f, "bit"),
            Typ::Bool => write!(f, "bool"),
            Typ::String => write!(f, "string"),
            Typ::Int => write!(f, "int"),
            Typ::Range(lo, hi) => write!(f, "range({lo}, {hi})"),
            Typ::Atom(n) => write!(f, "atom({n})"),
            Typ::Bits(len, ord) => write!(f, "bits({len}, {ord})"),
            Typ::Vector(len, ord, elem) => write!(f, "vector({len}, {ord}, {elem})"),
            Typ::List(elem) => write!(f, "list({elem})"),
            Typ::Tuple(elems) => {
                write!(f, "(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Typ::Id(name) | Typ::Abbrev(name) | Typ::Bitfield(name) => write!(f, "{name}"),
            Typ::Ref(inner) => write!(f, "register({inner})"),
        }
    }
}
