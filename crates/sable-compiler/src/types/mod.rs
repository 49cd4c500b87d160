//! Compiled representation types.
//!
//! A [`CTyp`] says how a value is laid out in generated code. The one
//! question the rest of the backend keeps asking of it is
//! [`CTyp::is_stack`]: stack-representable values are plain machine values
//! moved by copy, everything else needs an explicit allocate/initialize pair
//! and exactly one release.

mod mapper;

pub use mapper::{TypeMapper, fits_i64};

use std::fmt;

use sable_core::Order;

/// Compiled representation type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CTyp {
    /// Arbitrary-precision integer.
    Int,
    /// Variable-length bit-vector.
    LBits(Order),
    /// Bit-vector of known width (at most 64) packed into a machine word.
    FBits(u32, Order),
    /// 64-bit signed integer.
    I64,
    Unit,
    Bool,
    /// Literal strings.
    String,
    Tuple(Vec<CTyp>),
    /// Struct with its fields in declaration order.
    Struct(String, Vec<(String, CTyp)>),
    /// Enumeration with its members.
    Enum(String, Vec<String>),
    /// Tagged union with its constructors and their payloads.
    Variant(String, Vec<(String, CTyp)>),
    /// Pointer to a register holding the inner representation.
    Ref(Box<CTyp>),
}

/// Widest bit-vector that is packed into a machine word.
pub const MAX_FBITS_WIDTH: u32 = 64;

impl CTyp {
    /// Whether values of this representation are plain, copyable machine values.
    pub fn is_stack(&self) -> bool {
        match self {
            CTyp::I64
            | CTyp::FBits(..)
            | CTyp::Unit
            | CTyp::Bool
            | CTyp::String
            | CTyp::Enum(..)
            | CTyp::Ref(_) => true,
            CTyp::Struct(_, fields) => fields.iter().all(|(_, ctyp)| ctyp.is_stack()),
            CTyp::Int | CTyp::LBits(_) | CTyp::Tuple(_) | CTyp::Variant(..) => false,
        }
    }

    /// Representation of a struct field, if this is a struct with that field.
    pub fn field(&self, name: &str) -> Option<&CTyp> {
        match self {
            CTyp::Struct(_, fields) => fields.iter().find(|(f, _)| f == name).map(|(_, c)| c),
            _ => None,
        }
    }

    /// Fields of a struct or tuple, tuples numbered from zero.
    pub fn fields(&self) -> Option<Vec<(String, CTyp)>> {
        match self {
            CTyp::Struct(_, fields) => Some(fields.clone()),
            CTyp::Tuple(elems) => Some(
                elems
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (tuple_field(i), c.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Whether a value of this representation can be stored as `other`
    /// unchanged.
    ///
    /// Packed bit-vectors share a machine representation, so a narrower one
    /// fits a wider one of the same ordering. The reverse needs a mask.
    pub fn compatible(&self, other: &CTyp) -> bool {
        match (self, other) {
            (CTyp::FBits(from, a), CTyp::FBits(to, b)) => a == b && from <= to,
            _ => self == other,
        }
    }
}

/// Field name used for the `i`th element of a tuple.
pub fn tuple_field(i: usize) -> String {
    format!("tup{i}")
}

impl fmt::Display for CTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CTyp::Int => write!(f, "big_int"),
            CTyp::LBits(ord) => write!(f, "lbits({ord})"),
            CTyp::FBits(width, ord) => write!(f, "fbits({width}, {ord})"),
            CTyp::I64 => write!(f, "mach_int"),
            CTyp::Unit => write!(f, "unit"),
            CTyp::Bool => write!(f, "bool"),
            CTyp::String => write!(f, "string"),
            CTyp::Tuple(elems) => {
                write!(f, "(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            CTyp::Struct(name, _) => write!(f, "struct {name}"),
            CTyp::Enum(name, _) => write!(f, "enum {name}"),
            CTyp::Variant(name, _) => write!(f, "union {name}"),
            CTyp::Ref(inner) => write!(f, "&{inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: CTyp) -> CTyp {
        CTyp::Struct(
            "point".into(),
            vec![("x".into(), x), ("y".into(), CTyp::I64)],
        )
    }

    #[test]
    fn leaves_classify() {
        assert!(CTyp::I64.is_stack());
        assert!(CTyp::FBits(64, Order::Dec).is_stack());
        assert!(CTyp::Bool.is_stack());
        assert!(CTyp::Unit.is_stack());
        assert!(!CTyp::Int.is_stack());
        assert!(!CTyp::LBits(Order::Dec).is_stack());
    }

    #[test]
    fn struct_follows_fields() {
        assert!(point(CTyp::I64).is_stack());
        assert!(!point(CTyp::Int).is_stack());
    }

    #[test]
    fn tuples_and_unions_are_heap() {
        assert!(!CTyp::Tuple(vec![CTyp::I64, CTyp::Bool]).is_stack());
        assert!(!CTyp::Variant("u".into(), vec![("A".into(), CTyp::Unit)]).is_stack());
        assert!(CTyp::Enum("e".into(), vec!["A".into()]).is_stack());
    }

    #[test]
    fn fbits_widen_but_do_not_narrow() {
        assert!(CTyp::FBits(8, Order::Dec).compatible(&CTyp::FBits(32, Order::Dec)));
        assert!(!CTyp::FBits(8, Order::Dec).compatible(&CTyp::FBits(8, Order::Inc)));
        assert!(!CTyp::FBits(32, Order::Dec).compatible(&CTyp::FBits(8, Order::Dec)));
        assert!(!CTyp::I64.compatible(&CTyp::Int));
    }

    #[test]
    fn tuple_fields_are_numbered() {
        let fields = CTyp::Tuple(vec![CTyp::Bool, CTyp::Int]).fields().unwrap();
        assert_eq!(fields[0], ("tup0".to_string(), CTyp::Bool));
        assert_eq!(fields[1], ("tup1".to_string(), CTyp::Int));
    }
}
