//! Runtime values of the reference interpreter.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};

use super::EvalError;
use crate::types::{CTyp, fits_i64};

/// A runtime value.
///
/// Both integer representations share [`Value::Int`] and both bit-vector
/// representations share [`Value::Bits`]; the representation a value is
/// stored in only decides how it is range checked or truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(BigInt),
    /// Bit-vector value and width.
    Bits(BigUint, u32),
    Str(String),
    /// Struct or tuple fields in layout order.
    Struct(Vec<(String, Value)>),
    /// Enum member.
    Enum(String),
    /// Active constructor and payload.
    Variant(String, Box<Value>),
    /// Reference to the named register.
    Ref(String),
}

impl Value {
    pub fn int(n: impl Into<BigInt>) -> Self {
        Value::Int(n.into())
    }

    pub fn bits(value: u64, width: u32) -> Self {
        Value::Bits(BigUint::from(value), width)
    }

    /// Unsigned value of a bit-vector that fits a machine word.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Bits(v, _) => v.to_u64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => n.to_i64(),
            _ => None,
        }
    }

    /// The value of a struct or tuple field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(f, _)| f == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub(super) fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Value::Struct(fields) => fields.iter_mut().find(|(f, _)| f == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Short description of the kind of value, for errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Bits(..) => "bit-vector",
            Value::Str(_) => "string",
            Value::Struct(_) => "struct",
            Value::Enum(_) => "enum",
            Value::Variant(..) => "union",
            Value::Ref(_) => "register reference",
        }
    }
}

/// Value of freshly allocated or declared storage.
pub fn default_of(ctyp: &CTyp) -> Value {
    match ctyp {
        CTyp::Int | CTyp::I64 => Value::Int(BigInt::zero()),
        CTyp::LBits(_) => Value::Bits(BigUint::zero(), 0),
        CTyp::FBits(width, _) => Value::Bits(BigUint::zero(), *width),
        CTyp::Unit => Value::Unit,
        CTyp::Bool => Value::Bool(false),
        CTyp::String => Value::Str(String::new()),
        CTyp::Tuple(_) | CTyp::Struct(..) => Value::Struct(
            ctyp.fields()
                .unwrap_or_default()
                .into_iter()
                .map(|(name, field)| {
                    let value = default_of(&field);
                    (name, value)
                })
                .collect(),
        ),
        CTyp::Enum(_, members) => Value::Enum(members.first().cloned().unwrap_or_default()),
        CTyp::Variant(_, ctors) => match ctors.first() {
            Some((ctor, payload)) => Value::Variant(ctor.clone(), Box::new(default_of(payload))),
            None => Value::Unit,
        },
        CTyp::Ref(_) => Value::Ref(String::new()),
    }
}

/// Bring a value into the shape of a representation.
///
/// Machine integers are range checked and packed bit-vectors truncated to
/// their width.
pub fn conform(value: Value, ctyp: &CTyp) -> Result<Value, EvalError> {
    match (value, ctyp) {
        (Value::Int(n), CTyp::I64) => {
            if fits_i64(&n) {
                Ok(Value::Int(n))
            } else {
                Err(EvalError::Overflow { value: n.to_string() })
            }
        }
        (v @ Value::Int(_), CTyp::Int) => Ok(v),
        (Value::Bits(v, _), CTyp::FBits(width, _)) => Ok(Value::Bits(truncate(v, *width), *width)),
        (v @ Value::Bits(..), CTyp::LBits(_)) => Ok(v),
        (Value::Unit, CTyp::Unit) => Ok(Value::Unit),
        (v @ Value::Bool(_), CTyp::Bool) => Ok(v),
        (v @ Value::Str(_), CTyp::String) => Ok(v),
        (v @ Value::Enum(_), CTyp::Enum(..)) => Ok(v),
        (v @ Value::Variant(..), CTyp::Variant(..)) => Ok(v),
        (v @ Value::Ref(_), CTyp::Ref(_)) => Ok(v),
        (Value::Struct(fields), CTyp::Struct(..) | CTyp::Tuple(_)) => {
            let layout = ctyp.fields().unwrap_or_default();
            let mut out = Vec::with_capacity(layout.len());
            for (name, field_ctyp) in layout {
                let value = fields
                    .iter()
                    .find(|(f, _)| *f == name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| default_of(&field_ctyp));
                out.push((name, conform(value, &field_ctyp)?));
            }
            Ok(Value::Struct(out))
        }
        (value, ctyp) => Err(EvalError::TypeMismatch {
            expected: ctyp.to_string(),
            found: value.kind(),
        }),
    }
}

/// Parse the textual form used for wide literals.
///
/// `0x` and `0b` prefixes give bit-vectors four and one bits per digit wide,
/// anything else is a decimal integer.
pub fn parse_literal(text: &str) -> Result<Value, EvalError> {
    let invalid = || EvalError::InvalidLiteral(text.to_string());
    let (digits, radix, bits_per_digit) = if let Some(hex) = text.strip_prefix("0x") {
        (hex, 16, 4)
    } else if let Some(bin) = text.strip_prefix("0b") {
        (bin, 2, 1)
    } else {
        let n = text.parse::<BigInt>().map_err(|_| invalid())?;
        return Ok(Value::Int(n));
    };
    let value = BigUint::parse_bytes(digits.as_bytes(), radix).ok_or_else(invalid)?;
    let width = u32::try_from(digits.len() * bits_per_digit).map_err(|_| invalid())?;
    Ok(Value::Bits(value, width))
}

/// Keep the low `width` bits.
pub fn truncate(value: BigUint, width: u32) -> BigUint {
    value & mask(width)
}

pub fn mask(width: u32) -> BigUint {
    (BigUint::from(1u8) << width) - BigUint::from(1u8)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bits(v, width) => write!(f, "0x{v:X}<{width}>"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Struct(fields) => {
                write!(f, "{{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} = {value}")?;
                }
                write!(f, " }}")
            }
            Value::Enum(member) => write!(f, "{member}"),
            Value::Variant(ctor, payload) => write!(f, "{ctor}({payload})"),
            Value::Ref(name) => write!(f, "&{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::Order;

    #[test]
    fn packed_bits_are_truncated() {
        let v = conform(Value::bits(0x1FF, 16), &CTyp::FBits(8, Order::Dec)).unwrap();
        assert_eq!(v, Value::bits(0xFF, 8));
    }

    #[test]
    fn machine_integers_are_range_checked() {
        let big: BigInt = BigInt::from(i64::MAX) + 1;
        assert!(conform(Value::Int(big.clone()), &CTyp::Int).is_ok());
        assert!(matches!(
            conform(Value::Int(big), &CTyp::I64),
            Err(EvalError::Overflow { .. })
        ));
    }

    #[test]
    fn structs_follow_layout() {
        let ctyp = CTyp::Struct(
            "p".into(),
            vec![("a".into(), CTyp::FBits(4, Order::Dec)), ("b".into(), CTyp::Bool)],
        );
        let value = Value::Struct(vec![("a".into(), Value::bits(0xFF, 8))]);
        let value = conform(value, &ctyp).unwrap();
        assert_eq!(value.field("a"), Some(&Value::bits(0xF, 4)));
        assert_eq!(value.field("b"), Some(&Value::Bool(false)));
    }

    #[test]
    fn mismatches() {
        let err = conform(Value::Bool(true), &CTyp::Int).unwrap_err();
        assert_eq!(
            err,
            EvalError::TypeMismatch {
                expected: "big_int".into(),
                found: "bool"
            }
        );
    }

    #[test]
    fn literal_text() {
        assert_eq!(parse_literal("0xFF").unwrap(), Value::bits(0xFF, 8));
        assert_eq!(parse_literal("0b101").unwrap(), Value::bits(5, 3));
        assert_eq!(
            parse_literal("-18446744073709551617").unwrap(),
            Value::Int("-18446744073709551617".parse().unwrap())
        );
        assert!(parse_literal("0xZZ").is_err());
    }
}
