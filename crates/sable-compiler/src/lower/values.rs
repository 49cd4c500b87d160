//! Lowering of trivial values.
//!
//! Literals that fit a machine word, enum members, register addresses and
//! precomputed fragments lower to inline fragments. A fragment never carries
//! an integer wider than a machine word into the instruction form. Locals
//! and registers lower to their names. Wide literals, tuples and `undefined` of a heap type are materialized
//! into temporaries released by the operand's cleanup.

use num_bigint::BigUint;
use sable_core::{CompilationError, IdClass, Lit, Order, Span, Typ};

use super::{Lowerer, Operand, Result, clear, transfer};
use crate::anf::AVal;
use crate::fragment::Fragment;
use crate::ir::{CLExp, CVal, Instr};
use crate::types::{CTyp, MAX_FBITS_WIDTH, fits_i64, tuple_field};

impl Lowerer<'_> {
    pub(super) fn operand(&mut self, val: AVal) -> Result<Operand> {
        match val {
            AVal::Lit(lit, typ) => self.literal(lit, &typ),
            AVal::Id(name, class, typ) => self.identifier(name, class, &typ),
            AVal::Ref(name, typ) => {
                Ok(Operand::pure(CVal::Frag(Fragment::AddrOf(name), self.ctyp(&typ)?)))
            }
            AVal::Tuple(elems) => self.tuple(elems),
            AVal::Vector(elems, typ) => self.bit_vector(elems, &typ),
            AVal::List(_, typ) => {
                self.ctyp(&typ)?;
                Err(CompilationError::UnrepresentableType {
                    typ: typ.to_string(),
                    span: Span::UNKNOWN,
                })
            }
            AVal::Frag(frag, typ) => self.fragment(frag, &typ),
        }
    }

    /// Integers beyond a machine word cannot appear inline. A bare one is
    /// parsed into a `big_int`, anything built around one is rejected.
    fn fragment(&mut self, frag: Fragment, typ: &Typ) -> Result<Operand> {
        let ctyp = self.ctyp(typ)?;
        if frag.fits_machine_word() {
            return Ok(Operand::pure(CVal::Frag(frag, ctyp)));
        }
        match frag {
            Fragment::Int(n) => Ok(self.parsed(CTyp::Int, n.to_string())),
            other => Err(CompilationError::mismatch(
                "big_int",
                &ctyp,
                format!("constant inside fragment '{other}'"),
            )),
        }
    }

    fn literal(&mut self, lit: Lit, typ: &Typ) -> Result<Operand> {
        let ctyp = self.ctyp(typ)?;
        match lit {
            Lit::Undefined => Ok(self.undefined(&ctyp)),
            Lit::Num(n) if fits_i64(&n) => {
                Ok(Operand::pure(CVal::Frag(Fragment::Int(n), CTyp::I64)))
            }
            Lit::Num(n) => Ok(self.parsed(CTyp::Int, n.to_string())),
            lit => match (Fragment::from_lit(&lit), lit) {
                (Some(frag), _) => {
                    let ctyp = match &frag {
                        Fragment::Bits(_, width) => CTyp::FBits(*width, order_of(&ctyp)),
                        _ => ctyp,
                    };
                    Ok(Operand::pure(CVal::Frag(frag, ctyp)))
                }
                (None, Lit::Hex(digits)) => {
                    Ok(self.parsed(CTyp::LBits(order_of(&ctyp)), format!("0x{digits}")))
                }
                (None, Lit::Bin(digits)) => {
                    Ok(self.parsed(CTyp::LBits(order_of(&ctyp)), format!("0b{digits}")))
                }
                (None, lit) => Err(CompilationError::internal(format!(
                    "literal {lit:?} has no fragment"
                ))),
            },
        }
    }

    /// A heap literal built from its textual form.
    fn parsed(&mut self, ctyp: CTyp, text: String) -> Operand {
        let source = CVal::Frag(Fragment::Str(text), CTyp::String);
        let (name, init) = self.temp_from(&ctyp, source);
        Operand {
            setup: vec![init],
            cleanup: clear(&name, &ctyp).into_iter().collect(),
            val: CVal::Id(name, ctyp),
        }
    }

    fn undefined(&mut self, ctyp: &CTyp) -> Operand {
        let (name, decl) = self.temp(ctyp);
        Operand {
            setup: vec![decl],
            cleanup: clear(&name, ctyp).into_iter().collect(),
            val: CVal::Id(name, ctyp.clone()),
        }
    }

    fn identifier(&mut self, name: String, class: IdClass, typ: &Typ) -> Result<Operand> {
        if let Some(local) = self.locals.get(&name) {
            return Ok(Operand::pure(CVal::Id(local.name.clone(), local.ctyp.clone())));
        }
        let ctyp = self.ctyp(typ)?;
        match class {
            IdClass::EnumMember => Ok(Operand::pure(CVal::Frag(Fragment::Id(name), ctyp))),
            IdClass::UnionCtor => {
                // A constructor used as a value is applied to unit.
                let (tmp, decl) = self.temp(&ctyp);
                let dest = CLExp::Id(tmp.clone(), ctyp.clone());
                Ok(Operand {
                    setup: vec![decl, Instr::Funcall(dest, name, vec![CVal::unit()])],
                    cleanup: clear(&tmp, &ctyp).into_iter().collect(),
                    val: CVal::Id(tmp, ctyp),
                })
            }
            _ => Ok(Operand::pure(CVal::Id(name, ctyp))),
        }
    }

    fn tuple(&mut self, elems: Vec<AVal>) -> Result<Operand> {
        let ctyp = self.ctyp(&AVal::Tuple(elems.clone()).typ())?;
        let (tmp, decl) = self.temp(&ctyp);
        let base = CLExp::Id(tmp.clone(), ctyp.clone());
        let fields = ctyp.fields().unwrap_or_default();

        let mut setup = vec![decl];
        for (i, (elem, (_, field_ctyp))) in elems.into_iter().zip(fields).enumerate() {
            let op = self.operand(elem)?;
            let dest = base.clone().field(tuple_field(i), field_ctyp);
            let store = transfer(dest, op.val, &format!("tuple element {i}"))?;
            setup.extend(op.setup);
            setup.push(store);
            self.release(&op.cleanup);
            setup.extend(op.cleanup);
        }

        Ok(Operand {
            setup,
            cleanup: clear(&tmp, &ctyp).into_iter().collect(),
            val: CVal::Id(tmp, ctyp),
        })
    }

    /// Vector literals of bits fold to a single bit-vector literal.
    fn bit_vector(&mut self, elems: Vec<AVal>, typ: &Typ) -> Result<Operand> {
        let ctyp = self.ctyp(typ)?;
        let mut value = BigUint::from(0u8);
        for elem in &elems {
            let bit = match elem {
                AVal::Lit(Lit::Bit(bit), _) => *bit,
                other => {
                    return Err(CompilationError::unsupported(
                        format!("vector literal with non-constant element '{other}'"),
                        Span::UNKNOWN,
                    ));
                }
            };
            value = (value << 1u8) | BigUint::from(u8::from(bit));
        }
        let width = u32::try_from(elems.len())
            .map_err(|_| CompilationError::internal("vector literal too long"))?;

        if width <= MAX_FBITS_WIDTH {
            Ok(Operand::pure(CVal::Frag(
                Fragment::Bits(value, width),
                CTyp::FBits(width, order_of(&ctyp)),
            )))
        } else {
            let text = format!("0b{:0width$b}", value, width = width as usize);
            Ok(self.parsed(CTyp::LBits(order_of(&ctyp)), text))
        }
    }
}

/// Ordering of a bit-vector representation.
fn order_of(ctyp: &CTyp) -> Order {
    match ctyp {
        CTyp::FBits(_, order) | CTyp::LBits(order) => *order,
        _ => Order::Dec,
    }
}
