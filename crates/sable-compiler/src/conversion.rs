//! Representation conversions.
//!
//! Only two families of values have more than one representation: integers
//! (`mach_int` and `big_int`) and bit-vectors (`fbits` and `lbits`).
//! Moving a value between the stack and the heap form of one family is the
//! main conversion lowering performs. Packed bit-vectors may also narrow,
//! which masks off the high bits. Everything else must already agree.
//!
//! ## Conversion kinds
//!
//! 1. Identity (same representation, or a packed bit-vector widening)
//! 2. Promote (stack to heap: `mach_int -> big_int`, `fbits -> lbits`)
//! 3. Demote (heap to stack: `big_int -> mach_int`, `lbits -> fbits`)
//! 4. Truncate (`fbits(w) -> fbits(v)` with `v < w`)

use crate::types::CTyp;

/// A conversion between two representations.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub kind: ConversionKind,
    pub from: CTyp,
    pub to: CTyp,
}

/// The kind of conversion being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// No conversion needed.
    Identity,
    /// Stack value into heap storage.
    Promote,
    /// Heap value into a stack slot.
    Demote,
    /// Packed bit-vector into a narrower one.
    Truncate,
}

impl Conversion {
    pub fn is_identity(&self) -> bool {
        self.kind == ConversionKind::Identity
    }
}

/// Find the conversion from one representation to another, if one exists.
pub fn find_conversion(from: &CTyp, to: &CTyp) -> Option<Conversion> {
    let kind = if from.compatible(to) {
        ConversionKind::Identity
    } else {
        match (from, to) {
            (CTyp::I64, CTyp::Int) => ConversionKind::Promote,
            (CTyp::Int, CTyp::I64) => ConversionKind::Demote,
            (CTyp::FBits(_, a), CTyp::LBits(b)) if a == b => ConversionKind::Promote,
            (CTyp::LBits(a), CTyp::FBits(_, b)) if a == b => ConversionKind::Demote,
            (CTyp::FBits(_, a), CTyp::FBits(_, b)) if a == b => ConversionKind::Truncate,
            _ => return None,
        }
    };
    Some(Conversion {
        kind,
        from: from.clone(),
        to: to.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::Order;

    fn kind(from: &CTyp, to: &CTyp) -> Option<ConversionKind> {
        find_conversion(from, to).map(|c| c.kind)
    }

    #[test]
    fn identity() {
        assert_eq!(kind(&CTyp::Int, &CTyp::Int), Some(ConversionKind::Identity));
        assert_eq!(
            kind(&CTyp::FBits(8, Order::Dec), &CTyp::FBits(16, Order::Dec)),
            Some(ConversionKind::Identity)
        );
    }

    #[test]
    fn integer_family() {
        assert_eq!(kind(&CTyp::I64, &CTyp::Int), Some(ConversionKind::Promote));
        assert_eq!(kind(&CTyp::Int, &CTyp::I64), Some(ConversionKind::Demote));
    }

    #[test]
    fn bit_vector_family() {
        let packed = CTyp::FBits(32, Order::Dec);
        let long = CTyp::LBits(Order::Dec);
        assert_eq!(kind(&packed, &long), Some(ConversionKind::Promote));
        assert_eq!(kind(&long, &packed), Some(ConversionKind::Demote));
        assert_eq!(kind(&CTyp::LBits(Order::Inc), &packed), None);
    }

    #[test]
    fn packed_narrowing_truncates() {
        let word = CTyp::FBits(32, Order::Dec);
        let byte = CTyp::FBits(8, Order::Dec);
        assert_eq!(kind(&word, &byte), Some(ConversionKind::Truncate));
        assert_eq!(kind(&byte, &word), Some(ConversionKind::Identity));
        assert_eq!(kind(&word, &CTyp::FBits(8, Order::Inc)), None);
    }

    #[test]
    fn unrelated_representations() {
        assert_eq!(kind(&CTyp::Bool, &CTyp::Int), None);
        assert_eq!(kind(&CTyp::FBits(8, Order::Dec), &CTyp::I64), None);
        assert_eq!(
            kind(&CTyp::Tuple(vec![CTyp::I64]), &CTyp::Tuple(vec![CTyp::Int])),
            None
        );
    }
}
