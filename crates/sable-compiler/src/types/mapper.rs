//! Mapping from resolved source types to compiled representations.

use num_bigint::BigInt;
use sable_core::{CompilationError, NExp, Span, Typ, TypeOracle};

use super::{CTyp, MAX_FBITS_WIDTH};
use crate::context::CompilationContext;

/// Maps source types to [`CTyp`]s.
///
/// Reads the aggregate layouts registered so far and asks the oracle to
/// reduce symbolic sizes and bounds.
pub struct TypeMapper<'a> {
    ctx: &'a CompilationContext,
    oracle: &'a dyn TypeOracle,
}

impl<'a> TypeMapper<'a> {
    pub fn new(ctx: &'a CompilationContext, oracle: &'a dyn TypeOracle) -> Self {
        Self { ctx, oracle }
    }

    /// Map a source type to its representation.
    ///
    /// Bounded integers whose bounds are both known and inside the signed
    /// 64-bit range become [`CTyp::I64`]; bit-vectors of known length up to
    /// 64 are packed. Anything without a mapping is an
    /// [`CompilationError::UnrepresentableType`].
    pub fn ctyp(&self, typ: &Typ, span: Span) -> Result<CTyp, CompilationError> {
        match typ {
            Typ::Unit => Ok(CTyp::Unit),
            Typ::Bit => Ok(CTyp::FBits(1, sable_core::Order::Dec)),
            Typ::Bool => Ok(CTyp::Bool),
            Typ::String => Ok(CTyp::String),
            Typ::Int => Ok(CTyp::Int),
            Typ::Range(lo, hi) => Ok(self.integer(lo, hi)),
            Typ::Atom(n) => Ok(self.integer(n, n)),
            Typ::Bits(len, ord) => Ok(match self.oracle.simplify(len) {
                Some(len) if len <= BigInt::from(MAX_FBITS_WIDTH) && len >= BigInt::from(0) => {
                    CTyp::FBits(u32::try_from(len).unwrap_or(MAX_FBITS_WIDTH), *ord)
                }
                _ => CTyp::LBits(*ord),
            }),
            Typ::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(|elem| self.ctyp(elem, span))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CTyp::Tuple(elems))
            }
            Typ::Id(name) => {
                self.ctx
                    .lookup(name)
                    .ok_or_else(|| CompilationError::UnrepresentableType {
                        typ: name.clone(),
                        span,
                    })
            }
            Typ::Ref(inner) => Ok(CTyp::Ref(Box::new(self.ctyp(inner, span)?))),
            Typ::Vector(..) | Typ::List(_) | Typ::Abbrev(_) | Typ::Bitfield(_) => {
                Err(CompilationError::UnrepresentableType {
                    typ: typ.to_string(),
                    span,
                })
            }
        }
    }

    /// Bit width of a packed bit-vector type, if the type maps to one.
    pub fn fbits_width(&self, typ: &Typ) -> Option<u32> {
        match self.ctyp(typ, Span::UNKNOWN) {
            Ok(CTyp::FBits(width, _)) => Some(width),
            _ => None,
        }
    }

    fn integer(&self, lo: &NExp, hi: &NExp) -> CTyp {
        match (self.oracle.simplify(lo), self.oracle.simplify(hi)) {
            (Some(lo), Some(hi)) if fits_i64(&lo) && fits_i64(&hi) => CTyp::I64,
            _ => CTyp::Int,
        }
    }
}

/// Whether a constant lies in the signed 64-bit range.
pub fn fits_i64(n: &BigInt) -> bool {
    *n >= BigInt::from(i64::MIN) && *n <= BigInt::from(i64::MAX)
}
