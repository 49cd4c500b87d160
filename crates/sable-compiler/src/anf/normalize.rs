//! Conversion of checked expressions into A-normal form.
//!
//! Compound sub-expressions in argument position are hoisted into fresh
//! `let` bindings placed immediately before their use. Bindings for the
//! arguments of one node are emitted in source order, so side effects run
//! left to right exactly as in the original program.

use sable_core::{CompilationError, Exp, ExpKind, IdClass, LExp, Lit, Pat, Span, Typ, TypeOracle};

use super::{AExp, AVal, LocalEnv, builtins};
use crate::gensym::NameGen;

type Result<T> = std::result::Result<T, CompilationError>;

/// Bindings hoisted out of argument positions, outermost first.
#[derive(Default)]
struct Hoisted(Vec<(String, Typ, AExp)>);

impl Hoisted {
    /// Wrap `body` in the hoisted bindings, preserving their order.
    fn wrap(self, body: AExp) -> AExp {
        self.0.into_iter().rev().fold(body, |body, (id, typ, init)| {
            let body_typ = body.typ();
            AExp::Let(id, typ, Box::new(init), Box::new(body), body_typ)
        })
    }
}

/// Normalizes the body of one top-level definition.
pub struct Normalizer<'a> {
    oracle: &'a dyn TypeOracle,
    names: &'a mut NameGen,
    locals: LocalEnv,
}

impl<'a> Normalizer<'a> {
    pub fn new(oracle: &'a dyn TypeOracle, names: &'a mut NameGen) -> Self {
        Self {
            oracle,
            names,
            locals: LocalEnv::new(),
        }
    }

    /// Bring a function parameter into scope.
    pub fn declare_param(&mut self, name: &str, typ: Typ) {
        self.locals.declare(name, typ, false);
    }

    /// Normalize an expression.
    pub fn normalize(&mut self, exp: &Exp) -> Result<AExp> {
        let typ = exp.typ.clone();
        match &exp.kind {
            ExpKind::Lit(lit) => Ok(AExp::Val(AVal::Lit(lit.clone(), typ))),

            ExpKind::Id(name) => Ok(AExp::Val(self.classify(name, typ))),
            ExpKind::Ref(name) => match self.locals.classify(name, self.oracle) {
                Some((IdClass::Register, reg_typ)) => Ok(AExp::Val(AVal::Ref(
                    name.clone(),
                    Typ::Ref(Box::new(reg_typ)),
                ))),
                _ => Err(CompilationError::InvalidReference {
                    name: name.clone(),
                    span: exp.span,
                }),
            },

            ExpKind::Block(exps) => match exps.split_last() {
                None => Ok(AExp::Val(AVal::Lit(Lit::Unit, Typ::Unit))),
                Some((last, [])) => self.normalize(last),
                Some((last, prefix)) => {
                    let stmts = prefix
                        .iter()
                        .map(|e| self.normalize(e))
                        .collect::<Result<Vec<_>>>()?;
                    let last = self.normalize(last)?;
                    Ok(AExp::Block(stmts, Box::new(last), typ))
                }
            },

            ExpKind::Assign(LExp::Id(target), value) => {
                let target_typ = match self.locals.classify(target, self.oracle) {
                    Some((class, target_typ)) if class.is_assignable() => target_typ,
                    _ => {
                        return Err(CompilationError::InvalidAssignment {
                            target: target.clone(),
                            span: exp.span,
                        });
                    }
                };
                let value = self.normalize(value)?;
                Ok(AExp::Assign(target.clone(), target_typ, Box::new(value)))
            }
            ExpKind::Assign(lexp, _) => Err(CompilationError::unsupported(
                format!("assignment to {}", describe_lexp(lexp)),
                exp.span,
            )),

            ExpKind::Loop(kind, cond, body) => {
                let cond = self.normalize(cond)?;
                let body = self.normalize(body)?;
                Ok(AExp::Loop(*kind, Box::new(cond), Box::new(body)))
            }

            ExpKind::For {
                var,
                from,
                to,
                step,
                order,
                body,
            } => {
                let mut hoisted = Hoisted::default();
                let from_val = self.trivial(from, &mut hoisted)?;
                let to_val = self.trivial(to, &mut hoisted)?;
                let step_val = self.trivial(step, &mut hoisted)?;

                self.locals.push_scope();
                self.locals.declare(var, from.typ.clone(), false);
                let body = self.normalize(body);
                self.locals.pop_scope();

                Ok(hoisted.wrap(AExp::For {
                    var: var.clone(),
                    from: from_val,
                    to: to_val,
                    step: step_val,
                    order: *order,
                    body: Box::new(body?),
                }))
            }

            ExpKind::If(cond, then, els) => {
                let mut hoisted = Hoisted::default();
                let cond = self.trivial(cond, &mut hoisted)?;
                let then = self.normalize(then)?;
                let els = self.normalize(els)?;
                Ok(hoisted.wrap(AExp::If(cond, Box::new(then), Box::new(els), typ)))
            }

            ExpKind::App(name, args) => {
                let mut hoisted = Hoisted::default();
                let args = self.trivials(args, &mut hoisted)?;
                Ok(hoisted.wrap(AExp::App(name.clone(), args, typ)))
            }
            ExpKind::Tuple(elems) => {
                let mut hoisted = Hoisted::default();
                let elems = self.trivials(elems, &mut hoisted)?;
                Ok(hoisted.wrap(AExp::Val(AVal::Tuple(elems))))
            }
            ExpKind::List(elems) => {
                let mut hoisted = Hoisted::default();
                let elems = self.trivials(elems, &mut hoisted)?;
                Ok(hoisted.wrap(AExp::Val(AVal::List(elems, typ))))
            }
            ExpKind::Vector(elems) => {
                let mut hoisted = Hoisted::default();
                let elems = self.trivials(elems, &mut hoisted)?;
                Ok(hoisted.wrap(AExp::Val(AVal::Vector(elems, typ))))
            }

            ExpKind::Field(base, field) => {
                let mut hoisted = Hoisted::default();
                let base = self.trivial(base, &mut hoisted)?;
                Ok(hoisted.wrap(AExp::Field(base, field.clone(), typ)))
            }
            ExpKind::RecordUpdate(base, fields) => {
                let mut hoisted = Hoisted::default();
                let base = self.trivial(base, &mut hoisted)?;
                let mut updates = Vec::with_capacity(fields.len());
                for (field, value) in fields {
                    updates.push((field.clone(), self.trivial(value, &mut hoisted)?));
                }
                Ok(hoisted.wrap(AExp::RecordUpdate(base, updates, typ)))
            }

            ExpKind::Throw(value) => self.builtin(builtins::THROW, &[value], typ),
            ExpKind::Exit(value) => self.builtin(builtins::EXIT, &[value], typ),
            ExpKind::Assert(cond, message) => {
                self.builtin(builtins::ASSERT, &[cond, message], typ)
            }
            ExpKind::Cons(head, tail) => self.builtin(builtins::CONS, &[head, tail], typ),
            ExpKind::Return(value) => {
                let mut hoisted = Hoisted::default();
                let value = self.trivial(value, &mut hoisted)?;
                Ok(hoisted.wrap(AExp::Return(value, typ)))
            }

            ExpKind::Let(pat, init, body) => {
                let (name, bound) = match pat {
                    Pat::Id(name) => (name.clone(), init.typ.clone()),
                    Pat::Typed(bound, name) => (name.clone(), bound.clone()),
                    Pat::Wild => (self.names.fresh(), init.typ.clone()),
                    Pat::Tuple(_) => {
                        return Err(CompilationError::unsupported("tuple pattern", exp.span));
                    }
                };
                self.binding(name, bound, false, init, body, typ)
            }
            ExpKind::Var(LExp::Id(name), init, body) => {
                let bound = init.typ.clone();
                self.binding(name.clone(), bound, true, init, body, typ)
            }
            ExpKind::Var(lexp, _, _) => Err(CompilationError::unsupported(
                format!("var binding of {}", describe_lexp(lexp)),
                exp.span,
            )),

            ExpKind::Cast(target, inner) => {
                let inner = self.normalize(inner)?;
                Ok(AExp::Cast(Box::new(inner), target.clone()))
            }

            ExpKind::Try(..) => Err(unsupported("exception handler", exp.span)),
            ExpKind::VectorAccess(..) => Err(unsupported("vector access", exp.span)),
            ExpKind::VectorSubrange(..) => Err(unsupported("vector subrange", exp.span)),
            ExpKind::VectorUpdate(..) => Err(unsupported("vector update", exp.span)),
            ExpKind::VectorAppend(..) => Err(unsupported("vector append", exp.span)),
            ExpKind::InternalValue(_) => Err(unsupported("interpreter value", exp.span)),
            ExpKind::Sizeof(_) => Err(unsupported("sizeof", exp.span)),
            ExpKind::Constraint(_) => Err(unsupported("constraint", exp.span)),
            ExpKind::Nondet(_) => Err(unsupported("nondeterministic choice", exp.span)),
        }
    }

    fn classify(&self, name: &str, typ: Typ) -> AVal {
        let class = self
            .locals
            .classify(name, self.oracle)
            .map(|(class, _)| class)
            .unwrap_or(IdClass::Unresolved);
        AVal::Id(name.to_string(), class, typ)
    }

    /// Normalize `exp` and force it to a trivial value, hoisting if needed.
    fn trivial(&mut self, exp: &Exp, hoisted: &mut Hoisted) -> Result<AVal> {
        match self.normalize(exp)? {
            AExp::Val(value) => Ok(value),
            aexp => {
                let id = self.names.fresh();
                let typ = aexp.typ();
                hoisted.0.push((id.clone(), typ.clone(), aexp));
                Ok(AVal::Id(id, IdClass::ImmutableLocal, typ))
            }
        }
    }

    fn trivials(&mut self, exps: &[Exp], hoisted: &mut Hoisted) -> Result<Vec<AVal>> {
        exps.iter().map(|e| self.trivial(e, hoisted)).collect()
    }

    fn builtin(&mut self, name: &str, args: &[&Exp], typ: Typ) -> Result<AExp> {
        let mut hoisted = Hoisted::default();
        let mut vals = Vec::with_capacity(args.len());
        for arg in args {
            vals.push(self.trivial(arg, &mut hoisted)?);
        }
        Ok(hoisted.wrap(AExp::App(name.to_string(), vals, typ)))
    }

    fn binding(
        &mut self,
        name: String,
        bound: Typ,
        mutable: bool,
        init: &Exp,
        body: &Exp,
        typ: Typ,
    ) -> Result<AExp> {
        let init = self.normalize(init)?;

        self.locals.push_scope();
        self.locals.declare(name.clone(), bound.clone(), mutable);
        let body = self.normalize(body);
        self.locals.pop_scope();

        Ok(AExp::Let(name, bound, Box::new(init), Box::new(body?), typ))
    }
}

fn unsupported(construct: &str, span: Span) -> CompilationError {
    CompilationError::unsupported(construct, span)
}

fn describe_lexp(lexp: &LExp) -> String {
    match lexp {
        LExp::Id(name) => name.clone(),
        LExp::VectorElem(name, _) => format!("element of '{name}'"),
        LExp::VectorRange(name, _, _) => format!("slice of '{name}'"),
        LExp::VectorAppend(name, _) => format!("append to '{name}'"),
    }
}
