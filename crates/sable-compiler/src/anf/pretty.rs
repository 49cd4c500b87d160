//! Textual rendering of ANF terms, for tracing and test failures.

use std::fmt;

use sable_core::{Lit, LoopKind};

use super::{AExp, AVal};

fn write_lit(f: &mut fmt::Formatter<'_>, lit: &Lit) -> fmt::Result {
    match lit {
        Lit::Unit => write!(f, "()"),
        Lit::Bool(b) => write!(f, "{b}"),
        Lit::Bit(b) => write!(f, "{}", if *b { "bitone" } else { "bitzero" }),
        Lit::Num(n) => write!(f, "{n}"),
        Lit::Hex(digits) => write!(f, "0x{digits}"),
        Lit::Bin(digits) => write!(f, "0b{digits}"),
        Lit::String(s) => write!(f, "{s:?}"),
        Lit::Undefined => write!(f, "undefined"),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, vals: &[AVal]) -> fmt::Result {
    for (i, val) in vals.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{val}")?;
    }
    Ok(())
}

impl fmt::Display for AVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AVal::Lit(lit, _) => write_lit(f, lit),
            AVal::Id(name, _, _) => write!(f, "{name}"),
            AVal::Ref(name, _) => write!(f, "&{name}"),
            AVal::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                write!(f, ")")
            }
            AVal::List(elems, _) => {
                write!(f, "[|")?;
                write_list(f, elems)?;
                write!(f, "|]")
            }
            AVal::Vector(elems, _) => {
                write!(f, "[")?;
                write_list(f, elems)?;
                write!(f, "]")
            }
            AVal::Frag(frag, _) => write!(f, "{{{frag}}}"),
        }
    }
}

impl fmt::Display for AExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AExp::Val(val) => write!(f, "{val}"),
            AExp::App(name, args, _) => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            AExp::Cast(inner, typ) => write!(f, "({inner} : {typ})"),
            AExp::Assign(id, _, value) => write!(f, "{id} = {value}"),
            AExp::Let(id, typ, init, body, _) => {
                write!(f, "let {id} : {typ} = {init} in {body}")
            }
            AExp::Block(stmts, last, _) => {
                write!(f, "{{ ")?;
                for stmt in stmts {
                    write!(f, "{stmt}; ")?;
                }
                write!(f, "{last} }}")
            }
            AExp::Return(val, _) => write!(f, "return {val}"),
            AExp::If(cond, then, els, _) => write!(f, "if {cond} then {then} else {els}"),
            AExp::Field(base, field, _) => write!(f, "{base}.{field}"),
            AExp::RecordUpdate(base, fields, _) => {
                write!(f, "{{ {base} with ")?;
                for (i, (field, val)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field} = {val}")?;
                }
                write!(f, " }}")
            }
            AExp::For {
                var,
                from,
                to,
                step,
                order,
                body,
            } => write!(f, "foreach ({var} from {from} to {to} by {step} in {order}) {body}"),
            AExp::Loop(LoopKind::While, cond, body) => write!(f, "while {cond} do {body}"),
            AExp::Loop(LoopKind::Until, cond, body) => write!(f, "repeat {body} until {cond}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{IdClass, Typ};

    #[test]
    fn renders_nested_terms() {
        let x = AVal::Id("x".into(), IdClass::ImmutableLocal, Typ::Int);
        let exp = AExp::Let(
            "y".into(),
            Typ::Int,
            Box::new(AExp::App("f".into(), vec![x.clone(), AVal::unit()], Typ::Int)),
            Box::new(AExp::Val(AVal::Tuple(vec![x, AVal::Lit(Lit::Hex("FF".into()), Typ::bits(8))]))),
            Typ::Unit,
        );
        assert_eq!(exp.to_string(), "let y : int = f(x, ()) in (x, 0xFF)");
    }
}
