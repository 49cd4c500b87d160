//! IR lowering.
//!
//! The [`Lowerer`] translates a normalized, specialized function body into
//! a list of [`Instr`]. Every sub-expression lowers to a [`Lowered`]: the
//! instructions that compute it, its representation, a `finish` that writes
//! the value to a destination chosen by the caller, and the instructions
//! that release whatever the computation allocated. The caller decides where
//! the value goes, then always splices the cleanup after consuming it.
//!
//! # Resource discipline
//!
//! Heap-represented storage is allocated before anything that may write to
//! it is lowered and released in reverse allocation order. The lowerer keeps
//! the stack of allocations that are live at the current program point so
//! that an early `return` can release them, innermost first.
//!
//! # Example
//!
//! ```ignore
//! let mut lowerer = Lowerer::new(&ctx, &oracle, &mut names);
//! let function = lowerer.function("f", params, CTyp::I64, body)?;
//! ```

mod calls;
mod control;
mod member;
mod values;

use rustc_hash::{FxHashMap, FxHashSet};
use sable_core::{CompilationError, Span, Typ, TypeOracle};

use crate::anf::AExp;
use crate::context::CompilationContext;
use crate::conversion::find_conversion;
use crate::gensym::NameGen;
use crate::ir::{CFunction, CLExp, CVal, Instr, RETURN_PARAM};
use crate::types::{CTyp, TypeMapper};

type Result<T> = std::result::Result<T, CompilationError>;

/// Writes a computed value into a destination.
pub type Finish = Box<dyn FnOnce(CLExp) -> Instr>;

/// A lowered expression.
pub struct Lowered {
    /// Instructions computing the value.
    pub setup: Vec<Instr>,
    /// Representation of the value.
    pub ctyp: CTyp,
    /// Store the value into a destination of representation `ctyp`.
    pub finish: Finish,
    /// Releases for storage allocated by `setup`, innermost first.
    pub cleanup: Vec<Instr>,
}

impl Lowered {
    /// A materialized value.
    fn value(setup: Vec<Instr>, val: CVal, cleanup: Vec<Instr>) -> Self {
        Self {
            setup,
            ctyp: val.ctyp().clone(),
            finish: Box::new(move |dest| store(dest, val)),
            cleanup,
        }
    }

    /// A computation run for effect, producing unit.
    fn effect(setup: Vec<Instr>) -> Self {
        Self {
            setup,
            ctyp: CTyp::Unit,
            finish: Box::new(|dest| Instr::Assign(dest, CVal::unit())),
            cleanup: Vec::new(),
        }
    }
}

/// A lowered trivial value.
struct Operand {
    setup: Vec<Instr>,
    val: CVal,
    cleanup: Vec<Instr>,
}

impl Operand {
    fn pure(val: CVal) -> Self {
        Self {
            setup: Vec::new(),
            val,
            cleanup: Vec::new(),
        }
    }
}

/// A local as seen by the generated code.
#[derive(Debug, Clone)]
struct Local {
    /// Name in the generated code; differs from the source name when the
    /// source name was already declared in this function.
    name: String,
    ctyp: CTyp,
}

/// Lowers function bodies.
pub struct Lowerer<'a> {
    ctx: &'a CompilationContext,
    oracle: &'a dyn TypeOracle,
    names: &'a mut NameGen,
    /// Locals in scope.
    locals: FxHashMap<String, Local>,
    /// Every name declared in the current function.
    declared: FxHashSet<String>,
    /// Heap allocations live at the current program point, outermost first.
    live: Vec<(String, CTyp)>,
    /// Result representation of the function being lowered.
    ret: Option<CTyp>,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        ctx: &'a CompilationContext,
        oracle: &'a dyn TypeOracle,
        names: &'a mut NameGen,
    ) -> Self {
        Self {
            ctx,
            oracle,
            names,
            locals: FxHashMap::default(),
            declared: FxHashSet::default(),
            live: Vec::new(),
            ret: None,
        }
    }

    /// Lower a function body.
    ///
    /// A stack-represented result is collected in a local that the body
    /// returns. A heap-represented result is written through the
    /// [`RETURN_PARAM`] out-parameter and the body returns unit.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn function(
        &mut self,
        name: &str,
        params: Vec<(String, CTyp)>,
        ret: CTyp,
        body: AExp,
    ) -> Result<CFunction> {
        self.locals.clear();
        self.declared.clear();
        self.live.clear();
        self.declared.insert(RETURN_PARAM.to_string());
        for (param, ctyp) in &params {
            self.declared.insert(param.clone());
            self.locals.insert(
                param.clone(),
                Local {
                    name: param.clone(),
                    ctyp: ctyp.clone(),
                },
            );
        }
        self.ret = Some(ret.clone());

        let context = format!("result of {name}");
        let lowered = self.lower_to(body, &ret, &context);
        self.ret = None;
        let lowered = lowered?;

        let body = if ret.is_stack() {
            let slot = self.names.fresh();
            let mut body = vec![Instr::Decl(ret.clone(), slot.clone())];
            body.extend(self.close(lowered, CLExp::Id(slot.clone(), ret.clone())));
            body.push(Instr::Return(CVal::Id(slot, ret.clone())));
            body
        } else {
            let mut body = self.close(lowered, CLExp::Deref(RETURN_PARAM.into(), ret.clone()));
            body.push(Instr::Return(CVal::unit()));
            body
        };

        if let Some((leaked, _)) = self.live.last() {
            return Err(CompilationError::internal(format!(
                "'{leaked}' is never released in {name}"
            )));
        }

        Ok(CFunction {
            name: name.to_string(),
            params,
            ret,
            body,
        })
    }

    /// Lower an expression in its own representation.
    pub fn lower(&mut self, aexp: AExp) -> Result<Lowered> {
        match aexp {
            AExp::Val(val) => {
                let op = self.operand(val)?;
                Ok(Lowered::value(op.setup, op.val, op.cleanup))
            }
            AExp::App(name, args, typ) => self.lower_app(name, args, &typ),
            AExp::Cast(inner, typ) => {
                let ctyp = self.ctyp(&typ)?;
                self.lower_to(*inner, &ctyp, "cast")
            }
            AExp::Assign(target, typ, value) => self.lower_assign(target, &typ, *value),
            AExp::Let(id, typ, init, body, _) => self.lower_let(id, &typ, *init, *body, None),
            AExp::Block(stmts, last, _) => self.lower_block(stmts, *last, None),
            AExp::Return(val, typ) => {
                let ctyp = self.ctyp(&typ).unwrap_or(CTyp::Unit);
                self.lower_return(val, ctyp)
            }
            AExp::If(cond, then, els, typ) => {
                let ctyp = self.ctyp(&typ)?;
                self.lower_if(cond, *then, *els, ctyp)
            }
            AExp::Field(base, field, typ) => self.lower_field(base, field, &typ),
            AExp::RecordUpdate(base, fields, typ) => self.lower_record_update(base, fields, &typ),
            AExp::For {
                var,
                from,
                to,
                step,
                order,
                body,
            } => self.lower_for(var, from, to, step, order, *body),
            AExp::Loop(kind, cond, body) => self.lower_loop(kind, *cond, *body),
        }
    }

    /// Lower an expression so that it produces the given representation.
    ///
    /// Conditionals, bindings and blocks pass the target down to the
    /// expressions that produce their value, so no conversion temporary is
    /// ever allocated around a branch that may return early.
    pub fn lower_to(&mut self, aexp: AExp, target: &CTyp, context: &str) -> Result<Lowered> {
        match aexp {
            AExp::If(cond, then, els, _) => self.lower_if(cond, *then, *els, target.clone()),
            AExp::Let(id, typ, init, body, _) => {
                self.lower_let(id, &typ, *init, *body, Some((target, context)))
            }
            AExp::Block(stmts, last, _) => self.lower_block(stmts, *last, Some((target, context))),
            AExp::Cast(inner, _) => self.lower_to(*inner, target, context),
            AExp::Return(val, _) => self.lower_return(val, target.clone()),
            other => {
                let lowered = self.lower(other)?;
                self.coerce(lowered, target, context)
            }
        }
    }

    /// Bridge a lowered value to another representation.
    fn coerce(&mut self, lowered: Lowered, target: &CTyp, context: &str) -> Result<Lowered> {
        let conversion = find_conversion(&lowered.ctyp, target)
            .ok_or_else(|| CompilationError::mismatch(&lowered.ctyp, target, context))?;
        if conversion.is_identity() {
            return Ok(Lowered {
                ctyp: target.clone(),
                ..lowered
            });
        }

        let Lowered {
            mut setup,
            ctyp: from,
            finish,
            cleanup,
        } = lowered;
        let (tmp, decl) = self.temp(&from);
        setup.push(decl);
        setup.push(finish(CLExp::Id(tmp.clone(), from.clone())));

        let mut released = clear(&tmp, &from).into_iter().collect::<Vec<_>>();
        released.extend(cleanup);

        Ok(Lowered {
            setup,
            ctyp: target.clone(),
            finish: Box::new(move |dest| Instr::Convert(dest, CVal::Id(tmp, from))),
            cleanup: released,
        })
    }

    fn lower_let(
        &mut self,
        id: String,
        typ: &Typ,
        init: AExp,
        body: AExp,
        target: Option<(&CTyp, &str)>,
    ) -> Result<Lowered> {
        let ctyp = self.ctyp(typ)?;
        let name = self.local_name(&id);
        let decl = self.declare(&name, &ctyp);

        let mut setup = vec![decl];
        let init = self.lower_to(init, &ctyp, &format!("binding of '{id}'"))?;
        setup.extend(self.close(init, CLExp::Id(name.clone(), ctyp.clone())));

        let previous = self.locals.insert(
            id.clone(),
            Local {
                name: name.clone(),
                ctyp: ctyp.clone(),
            },
        );
        let body = match target {
            Some((target, context)) => self.lower_to(body, target, context),
            None => self.lower(body),
        };
        match previous {
            Some(local) => self.locals.insert(id, local),
            None => self.locals.remove(&id),
        };
        let body = body?;

        setup.extend(body.setup);
        let mut cleanup = body.cleanup;
        cleanup.extend(clear(&name, &ctyp));
        Ok(Lowered {
            setup,
            ctyp: body.ctyp,
            finish: body.finish,
            cleanup,
        })
    }

    fn lower_block(
        &mut self,
        stmts: Vec<AExp>,
        last: AExp,
        target: Option<(&CTyp, &str)>,
    ) -> Result<Lowered> {
        let mut setup = Vec::new();
        for stmt in stmts {
            setup.extend(self.discard(stmt)?);
        }
        let last = match target {
            Some((target, context)) => self.lower_to(last, target, context)?,
            None => self.lower(last)?,
        };
        setup.extend(last.setup);
        Ok(Lowered { setup, ..last })
    }

    /// Lower an expression for effect into a temporary released straight away.
    fn discard(&mut self, aexp: AExp) -> Result<Vec<Instr>> {
        let ctyp = self.ctyp(&aexp.typ())?;
        let (tmp, decl) = self.temp(&ctyp);
        let lowered = self.lower_to(aexp, &ctyp, "statement")?;

        let mut out = vec![decl];
        out.extend(self.close(lowered, CLExp::Id(tmp.clone(), ctyp.clone())));
        if let Some(release) = clear(&tmp, &ctyp) {
            self.release(std::slice::from_ref(&release));
            out.push(release);
        }
        Ok(out)
    }

    fn lower_assign(&mut self, target: String, typ: &Typ, value: AExp) -> Result<Lowered> {
        let (name, ctyp) = match self.locals.get(&target) {
            Some(local) => (local.name.clone(), local.ctyp.clone()),
            None => (target.clone(), self.ctyp(typ)?),
        };
        let value = self.lower_to(value, &ctyp, &format!("assignment to '{target}'"))?;
        let setup = self.close(value, CLExp::Id(name, ctyp));
        Ok(Lowered::effect(setup))
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    fn ctyp(&self, typ: &Typ) -> Result<CTyp> {
        TypeMapper::new(self.ctx, self.oracle).ctyp(typ, Span::UNKNOWN)
    }

    /// Write a lowered value into a destination and release its storage.
    fn close(&mut self, lowered: Lowered, dest: CLExp) -> Vec<Instr> {
        let Lowered {
            mut setup,
            finish,
            cleanup,
            ..
        } = lowered;
        self.release(&cleanup);
        setup.push(finish(dest));
        setup.extend(cleanup);
        setup
    }

    /// Declare a named local, tracking it as live if heap-represented.
    fn declare(&mut self, name: &str, ctyp: &CTyp) -> Instr {
        if ctyp.is_stack() {
            Instr::Decl(ctyp.clone(), name.to_string())
        } else {
            self.live.push((name.to_string(), ctyp.clone()));
            Instr::Alloc(ctyp.clone(), name.to_string())
        }
    }

    /// Declare a fresh temporary.
    fn temp(&mut self, ctyp: &CTyp) -> (String, Instr) {
        let name = self.names.fresh();
        self.declared.insert(name.clone());
        let decl = self.declare(&name, ctyp);
        (name, decl)
    }

    /// Declare a fresh heap temporary initialized from a value.
    fn temp_from(&mut self, ctyp: &CTyp, val: CVal) -> (String, Instr) {
        let name = self.names.fresh();
        self.declared.insert(name.clone());
        self.live.push((name.clone(), ctyp.clone()));
        (name.clone(), Instr::Init(ctyp.clone(), name, val))
    }

    /// Mark the allocations released by `cleanup` as no longer live.
    fn release(&mut self, cleanup: &[Instr]) {
        for instr in cleanup {
            if let Instr::Clear(_, name) = instr
                && let Some(pos) = self.live.iter().rposition(|(live, _)| live == name)
            {
                self.live.remove(pos);
            }
        }
    }

    /// Generated-code name for a source local.
    fn local_name(&mut self, id: &str) -> String {
        if self.declared.insert(id.to_string()) {
            id.to_string()
        } else {
            let name = self.names.fresh();
            self.declared.insert(name.clone());
            name
        }
    }
}

/// Plain store of a value whose representation matches the destination.
fn store(dest: CLExp, val: CVal) -> Instr {
    if dest.ctyp().is_stack() {
        Instr::Assign(dest, val)
    } else {
        Instr::Copy(dest, val)
    }
}

/// Store a value, converting between representations where allowed.
fn transfer(dest: CLExp, val: CVal, context: &str) -> Result<Instr> {
    let conversion = find_conversion(val.ctyp(), dest.ctyp())
        .ok_or_else(|| CompilationError::mismatch(val.ctyp(), dest.ctyp(), context))?;
    Ok(if conversion.is_identity() {
        store(dest, val)
    } else {
        Instr::Convert(dest, val)
    })
}

/// Release instruction for a local, if it is heap-represented.
fn clear(name: &str, ctyp: &CTyp) -> Option<Instr> {
    (!ctyp.is_stack()).then(|| Instr::Clear(ctyp.clone(), name.to_string()))
}

/// Instructions of one branch arm writing into `dest`.
fn arm(lowered: Lowered, dest: CLExp) -> Vec<Instr> {
    let Lowered {
        mut setup,
        finish,
        cleanup,
        ..
    } = lowered;
    setup.push(finish(dest));
    setup.extend(cleanup);
    setup
}
