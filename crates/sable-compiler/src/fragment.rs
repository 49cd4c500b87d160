//! Target-language expression fragments.
//!
//! A fragment is a small, side-effect-free expression that the code
//! generator renders inline. Literals become fragments, and the primitive
//! specializer fuses operator chains into them so that no intermediate
//! storage is needed. Fragments are only ever built over stack-representable
//! operands, with the single exception of field projections, which may name
//! a heap-represented field.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;
use sable_core::Lit;

/// Binary operators available inside fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Eq,
    Lt,
    Gt,
}

impl BinOp {
    /// C spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::Eq => "==",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
        }
    }
}

/// Unary operators available inside fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,
}

/// An inline expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// A named value (local, register, enum member).
    Id(String),
    Unit,
    Bool(bool),
    Int(BigInt),
    /// Bit-vector literal with its width.
    Bits(BigUint, u32),
    Str(String),
    /// Projection of a struct or tuple field.
    Field(Box<Fragment>, String),
    Binary(BinOp, Box<Fragment>, Box<Fragment>),
    Unary(UnOp, Box<Fragment>),
    /// Address of a register.
    AddrOf(String),
}

impl Fragment {
    pub fn id(name: impl Into<String>) -> Self {
        Fragment::Id(name.into())
    }

    pub fn binary(op: BinOp, lhs: Fragment, rhs: Fragment) -> Self {
        Fragment::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn field(base: Fragment, field: impl Into<String>) -> Self {
        Fragment::Field(Box::new(base), field.into())
    }

    /// All-ones mask of the given width.
    pub fn mask(width: u32) -> Self {
        let mask = (BigUint::from(1u8) << width) - BigUint::from(1u8);
        Fragment::Bits(mask, width)
    }

    /// The fragment for a literal, if it fits in one.
    ///
    /// Bit-vector literals wider than a machine word have no fragment.
    pub fn from_lit(lit: &Lit) -> Option<Self> {
        match lit {
            Lit::Unit => Some(Fragment::Unit),
            Lit::Bool(b) => Some(Fragment::Bool(*b)),
            Lit::Bit(b) => Some(Fragment::Bits(BigUint::from(u8::from(*b)), 1)),
            Lit::Num(n) => Some(Fragment::Int(n.clone())),
            Lit::Hex(digits) => bits_literal(digits, 16, 4),
            Lit::Bin(digits) => bits_literal(digits, 2, 1),
            Lit::String(s) => Some(Fragment::Str(s.clone())),
            Lit::Undefined => None,
        }
    }

    /// Whether the fragment is a literal with no free names.
    pub fn is_literal(&self) -> bool {
        match self {
            Fragment::Id(_) | Fragment::Field(..) | Fragment::AddrOf(_) => false,
            Fragment::Unit
            | Fragment::Bool(_)
            | Fragment::Int(_)
            | Fragment::Bits(..)
            | Fragment::Str(_) => true,
            Fragment::Binary(_, lhs, rhs) => lhs.is_literal() && rhs.is_literal(),
            Fragment::Unary(_, operand) => operand.is_literal(),
        }
    }

    /// Whether every integer constant inside fits a signed machine word.
    pub fn fits_machine_word(&self) -> bool {
        match self {
            Fragment::Int(n) => n.to_i64().is_some(),
            Fragment::Field(base, _) => base.fits_machine_word(),
            Fragment::Binary(_, lhs, rhs) => lhs.fits_machine_word() && rhs.fits_machine_word(),
            Fragment::Unary(_, operand) => operand.fits_machine_word(),
            _ => true,
        }
    }
}

fn bits_literal(digits: &str, radix: u32, bits_per_digit: usize) -> Option<Fragment> {
    let width = u32::try_from(digits.len() * bits_per_digit).ok()?;
    if width > 64 {
        return None;
    }
    let value = BigUint::parse_bytes(digits.as_bytes(), radix)?;
    Some(Fragment::Bits(value, width))
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Id(name) => write!(f, "{name}"),
            Fragment::Unit => write!(f, "()"),
            Fragment::Bool(b) => write!(f, "{b}"),
            Fragment::Int(n) => write!(f, "{n}"),
            Fragment::Bits(bits, width) => write!(f, "0x{bits:X}<{width}>"),
            Fragment::Str(s) => write!(f, "{s:?}"),
            Fragment::Field(base, field) => write!(f, "{base}.{field}"),
            Fragment::Binary(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Fragment::Unary(UnOp::Not, operand) => write!(f, "!{operand}"),
            Fragment::AddrOf(name) => write!(f, "&{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks() {
        assert_eq!(Fragment::mask(8), Fragment::Bits(BigUint::from(0xFFu32), 8));
        assert_eq!(
            Fragment::mask(64),
            Fragment::Bits(BigUint::from(u64::MAX), 64)
        );
    }

    #[test]
    fn literal_detection() {
        let lit = Fragment::binary(BinOp::Add, Fragment::Int(1.into()), Fragment::Int(2.into()));
        assert!(lit.is_literal());
        let open = Fragment::binary(BinOp::Add, Fragment::id("x"), Fragment::Int(2.into()));
        assert!(!open.is_literal());
    }

    #[test]
    fn machine_word_bounds() {
        let max = Fragment::Int(BigInt::from(i64::MAX));
        assert!(max.fits_machine_word());
        let over = Fragment::Int(BigInt::from(i64::MAX) + 1);
        assert!(!over.fits_machine_word());
        assert!(!Fragment::binary(BinOp::Add, Fragment::Int(1.into()), over).fits_machine_word());
        assert!(Fragment::mask(64).fits_machine_word());
    }

    #[test]
    fn literals() {
        assert_eq!(
            Fragment::from_lit(&Lit::Hex("FF".into())),
            Some(Fragment::Bits(BigUint::from(255u32), 8))
        );
        assert_eq!(
            Fragment::from_lit(&Lit::Bin("101".into())),
            Some(Fragment::Bits(BigUint::from(5u32), 3))
        );
        assert_eq!(Fragment::from_lit(&Lit::Hex("0".repeat(17))), None);
        assert_eq!(Fragment::from_lit(&Lit::Undefined), None);
    }

    #[test]
    fn display() {
        let frag = Fragment::binary(
            BinOp::And,
            Fragment::binary(BinOp::Add, Fragment::Bits(BigUint::from(1u8), 16), Fragment::id("x")),
            Fragment::mask(16),
        );
        assert_eq!(frag.to_string(), "((0x1<16> + x) & 0xFFFF<16>)");
    }
}
