//! Primitive specialization.
//!
//! Rewrites applications of a handful of arithmetic and bit-vector
//! primitives into a single [`Fragment`] when every operand is already a
//! literal or a fragment and the result fits a machine word. Normalization
//! binds every inner call to a fresh immutable local, so the pass remembers
//! which locals were bound to constant fragments and reads them back as
//! operands: `add_atom(add_atom(1, 2), 4)` fuses to `((1 + 2) + 4)`.
//!
//! ## Primitives
//!
//! | Callee      | Result representation | Fragment                      |
//! |-------------|-----------------------|-------------------------------|
//! | `add_range` | `mach_int`            | `a + b`                       |
//! | `add_atom`  | `mach_int`            | `a + b`                       |
//! | `xor_vec`   | `fbits(w)`            | `a ^ b`                       |
//! | `add_vec`   | `fbits(w)`            | `(a + b) & mask(w)`           |
//!
//! The pass is best-effort. A mismatch (arity, unknown bound, wide vector,
//! operand that is not constant) leaves the application unchanged.

use rustc_hash::FxHashMap;
use sable_core::{IdClass, Span, Typ};
use thiserror::Error;
use tracing::trace;

use crate::anf::{AExp, AVal};
use crate::fragment::{BinOp, Fragment};
use crate::types::{CTyp, MAX_FBITS_WIDTH, TypeMapper};

/// Why an application was left alone.
#[derive(Debug, Error)]
enum SpecializeError {
    #[error("expected {expected} operands, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("result type '{0}' has no machine-word bound")]
    Bound(Typ),

    #[error("operand of type '{0}' is wider than a machine word")]
    Width(Typ),

    #[error("constant '{0}' does not fit a machine word")]
    Overflow(String),

    #[error("operand '{0}' is not a constant")]
    NotConstant(String),
}

type Result<T> = std::result::Result<T, SpecializeError>;

/// Immutable locals currently bound to constant fragments.
type Known = FxHashMap<String, Fragment>;

/// Fuses primitive applications into fragments.
pub struct Specializer<'a> {
    mapper: &'a TypeMapper<'a>,
}

impl<'a> Specializer<'a> {
    pub fn new(mapper: &'a TypeMapper<'a>) -> Self {
        Self { mapper }
    }

    /// Specialize every application in a normalized expression.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn specialize(&self, aexp: AExp) -> AExp {
        self.walk(aexp, &mut Known::default())
    }

    /// Specialize one application, or hand it back unchanged.
    pub fn app(&self, name: String, args: Vec<AVal>, typ: Typ) -> AExp {
        self.app_with(name, args, typ, &Known::default())
    }

    fn app_with(&self, name: String, args: Vec<AVal>, typ: Typ, known: &Known) -> AExp {
        if !is_specializable(&name) {
            return AExp::App(name, args, typ);
        }
        match self.fuse(&name, &args, &typ, known) {
            Ok(frag) => {
                trace!(callee = %name, fragment = %frag, "specialized primitive");
                AExp::Val(AVal::Frag(frag, typ))
            }
            Err(err) => {
                trace!(callee = %name, reason = %err, "primitive not specialized");
                AExp::App(name, args, typ)
            }
        }
    }

    fn walk(&self, aexp: AExp, known: &mut Known) -> AExp {
        match aexp {
            AExp::App(name, args, typ) => self.app_with(name, args, typ, known),
            AExp::Val(_) | AExp::Return(..) | AExp::Field(..) | AExp::RecordUpdate(..) => aexp,
            AExp::Cast(inner, typ) => AExp::Cast(Box::new(self.walk(*inner, known)), typ),
            AExp::Assign(id, typ, value) => {
                let value = self.walk(*value, known);
                AExp::Assign(id, typ, Box::new(value))
            }
            AExp::Let(id, typ, init, body, body_typ) => {
                let init = self.walk(*init, known);
                let constant = match &init {
                    AExp::Val(AVal::Frag(frag, frag_typ))
                        if frag.is_literal() && *frag_typ == typ =>
                    {
                        Some(frag.clone())
                    }
                    AExp::Val(AVal::Lit(lit, lit_typ)) if *lit_typ == typ => Fragment::from_lit(lit),
                    _ => None,
                };
                let body = self.scoped(&id, constant, known, |s, known| s.walk(*body, known));
                AExp::Let(id, typ, Box::new(init), Box::new(body), body_typ)
            }
            AExp::Block(stmts, last, typ) => {
                let stmts = stmts.into_iter().map(|stmt| self.walk(stmt, known)).collect();
                AExp::Block(stmts, Box::new(self.walk(*last, known)), typ)
            }
            AExp::If(cond, then, els, typ) => {
                let then = self.walk(*then, known);
                AExp::If(cond, Box::new(then), Box::new(self.walk(*els, known)), typ)
            }
            AExp::For {
                var,
                from,
                to,
                step,
                order,
                body,
            } => {
                let body = self.scoped(&var, None, known, |s, known| s.walk(*body, known));
                AExp::For {
                    var,
                    from,
                    to,
                    step,
                    order,
                    body: Box::new(body),
                }
            }
            AExp::Loop(kind, cond, body) => {
                let cond = self.walk(*cond, known);
                AExp::Loop(kind, Box::new(cond), Box::new(self.walk(*body, known)))
            }
        }
    }

    /// Run `f` with `id` bound to `constant`, or shadowed when there is none.
    fn scoped(
        &self,
        id: &str,
        constant: Option<Fragment>,
        known: &mut Known,
        f: impl FnOnce(&Self, &mut Known) -> AExp,
    ) -> AExp {
        let previous = match constant {
            Some(frag) => known.insert(id.to_string(), frag),
            None => known.remove(id),
        };
        let out = f(self, known);
        match previous {
            Some(frag) => known.insert(id.to_string(), frag),
            None => known.remove(id),
        };
        out
    }

    fn fuse(&self, name: &str, args: &[AVal], typ: &Typ, known: &Known) -> Result<Fragment> {
        let [lhs, rhs] = args else {
            return Err(SpecializeError::Arity {
                expected: 2,
                found: args.len(),
            });
        };

        match name {
            "add_range" | "add_atom" => {
                if self.mapper.ctyp(typ, Span::UNKNOWN).ok() != Some(CTyp::I64) {
                    return Err(SpecializeError::Bound(typ.clone()));
                }
                Ok(Fragment::binary(BinOp::Add, operand(lhs, known)?, operand(rhs, known)?))
            }
            "xor_vec" => {
                self.width(typ)?;
                self.width(&lhs.typ())?;
                self.width(&rhs.typ())?;
                Ok(Fragment::binary(BinOp::Xor, operand(lhs, known)?, operand(rhs, known)?))
            }
            "add_vec" => {
                let width = self.width(typ)?;
                self.width(&lhs.typ())?;
                self.width(&rhs.typ())?;
                let sum = Fragment::binary(BinOp::Add, operand(lhs, known)?, operand(rhs, known)?);
                Ok(Fragment::binary(BinOp::And, sum, Fragment::mask(width)))
            }
            _ => Err(SpecializeError::NotConstant(name.to_string())),
        }
    }

    fn width(&self, typ: &Typ) -> Result<u32> {
        match self.mapper.fbits_width(typ) {
            Some(width) if width <= MAX_FBITS_WIDTH => Ok(width),
            _ => Err(SpecializeError::Width(typ.clone())),
        }
    }
}

fn is_specializable(name: &str) -> bool {
    matches!(name, "add_range" | "add_atom" | "xor_vec" | "add_vec")
}

fn operand(val: &AVal, known: &Known) -> Result<Fragment> {
    let frag = constant(val, known)?;
    if frag.fits_machine_word() {
        Ok(frag)
    } else {
        Err(SpecializeError::Overflow(frag.to_string()))
    }
}

fn constant(val: &AVal, known: &Known) -> Result<Fragment> {
    match val {
        AVal::Frag(frag, _) => Ok(frag.clone()),
        AVal::Id(name, IdClass::ImmutableLocal, _) => known
            .get(name)
            .cloned()
            .ok_or_else(|| SpecializeError::NotConstant(name.clone())),
        AVal::Lit(lit, _) => {
            Fragment::from_lit(lit).ok_or_else(|| SpecializeError::NotConstant(val.to_string()))
        }
        other => Err(SpecializeError::NotConstant(other.to_string())),
    }
}
