//! Control flow lowering: conditionals, loops and early return.
//!
//! Loops lower onto [`Instr::Loop`] with an explicit [`Instr::Break`]. The
//! condition is fully evaluated and its storage released before the break
//! test, so leaving the loop never skips a release.

use sable_core::{CompilationError, LoopKind, Order};

use super::{Local, Lowered, Lowerer, Result, arm, transfer};
use crate::anf::{AExp, AVal};
use crate::fragment::{BinOp, Fragment, UnOp};
use crate::ir::{CLExp, CVal, Instr, RETURN_PARAM};
use crate::types::CTyp;

impl Lowerer<'_> {
    /// Both arms write the same destination in the same representation.
    pub(super) fn lower_if(
        &mut self,
        cond: AVal,
        then: AExp,
        els: AExp,
        ctyp: CTyp,
    ) -> Result<Lowered> {
        let op = self.operand(cond)?;
        let (flag, decl) = self.temp(&CTyp::Bool);
        let mut setup = op.setup;
        setup.push(decl);
        setup.push(transfer(
            CLExp::Id(flag.clone(), CTyp::Bool),
            op.val,
            "condition",
        )?);
        self.release(&op.cleanup);
        setup.extend(op.cleanup);

        let then = self.lower_to(then, &ctyp, "then branch")?;
        self.release(&then.cleanup);
        let els = self.lower_to(els, &ctyp, "else branch")?;
        self.release(&els.cleanup);

        let result = ctyp.clone();
        Ok(Lowered {
            setup,
            ctyp,
            finish: Box::new(move |dest| {
                let cond = CVal::Id(flag, CTyp::Bool);
                Instr::If(cond, arm(then, dest.clone()), arm(els, dest), result)
            }),
            cleanup: Vec::new(),
        })
    }

    pub(super) fn lower_loop(&mut self, kind: LoopKind, cond: AExp, body: AExp) -> Result<Lowered> {
        let (flag, decl) = self.temp(&CTyp::Bool);
        let flag_val = CVal::Id(flag.clone(), CTyp::Bool);

        let test = self.lower_to(cond, &CTyp::Bool, "loop condition")?;
        let mut test = self.close(test, CLExp::Id(flag, CTyp::Bool));
        let body = self.discard(body)?;

        let instrs = match kind {
            LoopKind::While => {
                let stop = CVal::Frag(
                    Fragment::Unary(UnOp::Not, Box::new(frag_of(&flag_val))),
                    CTyp::Bool,
                );
                test.push(Instr::If(stop, vec![Instr::Break], vec![], CTyp::Unit));
                test.extend(body);
                test
            }
            LoopKind::Until => {
                let mut instrs = body;
                instrs.extend(test);
                instrs.push(Instr::If(flag_val, vec![Instr::Break], vec![], CTyp::Unit));
                instrs
            }
        };

        Ok(Lowered::effect(vec![decl, Instr::Loop(instrs)]))
    }

    /// Counted loops run over machine integers.
    pub(super) fn lower_for(
        &mut self,
        var: String,
        from: AVal,
        to: AVal,
        step: AVal,
        order: Order,
        body: AExp,
    ) -> Result<Lowered> {
        let mut setup = Vec::new();
        let counter = self.local_name(&var);
        setup.push(Instr::Decl(CTyp::I64, counter.clone()));
        self.bound(&mut setup, &counter, from, "loop start")?;
        let (limit, decl) = self.temp(&CTyp::I64);
        setup.push(decl);
        self.bound(&mut setup, &limit, to, "loop end")?;
        let (stride, decl) = self.temp(&CTyp::I64);
        setup.push(decl);
        self.bound(&mut setup, &stride, step, "loop step")?;

        let (past, advance) = match order {
            Order::Inc => (BinOp::Gt, BinOp::Add),
            Order::Dec => (BinOp::Lt, BinOp::Sub),
        };
        let counter_frag = Fragment::id(counter.clone());
        let stop = Fragment::binary(past, counter_frag.clone(), Fragment::id(limit));
        let next = Fragment::binary(advance, counter_frag, Fragment::id(stride));

        let previous = self.locals.insert(
            var.clone(),
            Local {
                name: counter.clone(),
                ctyp: CTyp::I64,
            },
        );
        let body = self.discard(body);
        match previous {
            Some(local) => self.locals.insert(var, local),
            None => self.locals.remove(&var),
        };

        let mut instrs = vec![Instr::If(
            CVal::Frag(stop, CTyp::Bool),
            vec![Instr::Break],
            vec![],
            CTyp::Unit,
        )];
        instrs.extend(body?);
        instrs.push(Instr::Assign(
            CLExp::Id(counter, CTyp::I64),
            CVal::Frag(next, CTyp::I64),
        ));
        setup.push(Instr::Loop(instrs));

        Ok(Lowered::effect(setup))
    }

    fn bound(&mut self, setup: &mut Vec<Instr>, dest: &str, val: AVal, context: &str) -> Result<()> {
        let op = self.operand(val)?;
        setup.extend(op.setup);
        setup.push(transfer(CLExp::Id(dest.to_string(), CTyp::I64), op.val, context)?);
        self.release(&op.cleanup);
        setup.extend(op.cleanup);
        Ok(())
    }

    /// Store the result, release everything live and return.
    ///
    /// The expression never produces a value, so it claims whatever
    /// representation its context asks for.
    pub(super) fn lower_return(&mut self, val: AVal, ctyp: CTyp) -> Result<Lowered> {
        let ret = self.ret.clone().ok_or(CompilationError::ReturnOutsideFunction)?;

        let op = self.operand(val)?;
        let mut setup = op.setup;
        let result = if ret.is_stack() {
            let (slot, decl) = self.temp(&ret);
            setup.push(decl);
            setup.push(transfer(CLExp::Id(slot.clone(), ret.clone()), op.val, "return")?);
            CVal::Id(slot, ret)
        } else {
            let out = CLExp::Deref(RETURN_PARAM.to_string(), ret);
            setup.push(transfer(out, op.val, "return")?);
            CVal::unit()
        };
        self.release(&op.cleanup);
        setup.extend(op.cleanup);

        for (name, live) in self.live.iter().rev() {
            setup.push(Instr::Clear(live.clone(), name.clone()));
        }
        setup.push(Instr::Return(result));

        Ok(Lowered {
            setup,
            ctyp,
            finish: Box::new(|_| Instr::Comment("unreachable".to_string())),
            cleanup: Vec::new(),
        })
    }
}

fn frag_of(val: &CVal) -> Fragment {
    match val {
        CVal::Id(name, _) => Fragment::id(name.clone()),
        CVal::Frag(frag, _) => frag.clone(),
    }
}
