//! Lowering of applications.
//!
//! Arguments are bridged to the callee's parameter representations one by
//! one, left to right:
//! - a stack value passed to a heap parameter is copied into a fresh heap
//!   temporary, released after the call
//! - a heap value passed to a stack parameter is converted into a stack
//!   temporary
//!
//! The call's own result representation is bridged to what the call site
//! needs by the caller, through [`Lowerer::lower_to`].

use sable_core::{CompilationError, Typ};

use super::{Lowered, Lowerer, Result, clear};
use crate::anf::{AVal, builtins};
use crate::conversion::{ConversionKind, find_conversion};
use crate::ir::{CLExp, CVal, Instr};
use crate::types::CTyp;

impl Lowerer<'_> {
    pub(super) fn lower_app(&mut self, name: String, args: Vec<AVal>, typ: &Typ) -> Result<Lowered> {
        let (params, ret) = self.signature(&name, &args, typ)?;
        if params.len() != args.len() {
            return Err(CompilationError::internal(format!(
                "'{name}' takes {} arguments but is applied to {}",
                params.len(),
                args.len()
            )));
        }

        let mut setup = Vec::new();
        let mut vals = Vec::with_capacity(args.len());
        let mut releases = Vec::with_capacity(args.len());

        for (i, (arg, param)) in args.into_iter().zip(params).enumerate() {
            let op = self.operand(arg)?;
            setup.extend(op.setup);

            let context = format!("argument {} of '{name}'", i + 1);
            let conversion = find_conversion(op.val.ctyp(), &param)
                .ok_or_else(|| CompilationError::mismatch(op.val.ctyp(), &param, &context))?;

            let mut release = Vec::new();
            match conversion.kind {
                ConversionKind::Identity => vals.push(op.val),
                ConversionKind::Promote => {
                    let (tmp, init) = self.temp_from(&param, op.val);
                    setup.push(init);
                    release.extend(clear(&tmp, &param));
                    vals.push(CVal::Id(tmp, param));
                }
                ConversionKind::Demote | ConversionKind::Truncate => {
                    let (tmp, decl) = self.temp(&param);
                    setup.push(decl);
                    setup.push(Instr::Convert(CLExp::Id(tmp.clone(), param.clone()), op.val));
                    vals.push(CVal::Id(tmp, param));
                }
            }
            release.extend(op.cleanup);
            releases.push(release);
        }

        let cleanup = releases.into_iter().rev().flatten().collect();
        Ok(Lowered {
            setup,
            ctyp: ret,
            finish: Box::new(move |dest| Instr::Funcall(dest, name, vals)),
            cleanup,
        })
    }

    /// Parameter and result representations of a call target.
    ///
    /// Union constructors come from the layouts compiled so far, everything
    /// else from the oracle. The desugared builtins have no declared
    /// signature and take their arguments as they are.
    fn signature(&self, name: &str, args: &[AVal], typ: &Typ) -> Result<(Vec<CTyp>, CTyp)> {
        if let Some((union, payload)) = self.ctx.ctor(name) {
            return Ok((vec![payload], union));
        }
        if let Some(sig) = self.oracle.signature(name) {
            let params = sig
                .params
                .iter()
                .map(|p| self.ctyp(p))
                .collect::<Result<Vec<_>>>()?;
            return Ok((params, self.ctyp(&sig.ret)?));
        }
        if builtins::is_builtin(name) {
            let params = args
                .iter()
                .map(|arg| self.ctyp(&arg.typ()))
                .collect::<Result<Vec<_>>>()?;
            return Ok((params, self.ctyp(typ)?));
        }
        Err(CompilationError::UnknownFunction {
            name: name.to_string(),
        })
    }
}
