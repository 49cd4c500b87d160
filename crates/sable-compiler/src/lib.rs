//! Sable Compiler
//!
//! The backend of an ISA description language compiler: checked expression
//! trees in, C out.
//!
//! ## Pipeline
//!
//! Each top-level definition goes through, in order:
//!
//! 1. **Normalization** ([`anf`]): flatten into A-normal form
//! 2. **Specialization** ([`specialize`]): fuse primitive chains into fragments
//! 3. **Lowering** ([`lower`]): linear instructions with paired allocate/release
//! 4. **Verification** ([`ir::verify`]): check the pairing on every path
//!
//! The lowered definitions are then rendered as C by [`codegen`]. Every
//! stage maps source types with the [`types::TypeMapper`].
//!
//! ## Modules
//!
//! - [`anf`]: ANF forms and the normalizer
//! - [`codegen`]: C code generator
//! - [`context`]: aggregate layouts accumulated over a run
//! - [`conversion`]: representation conversions
//! - [`fragment`]: inline target expressions
//! - [`gensym`]: fresh names
//! - [`interp`]: reference interpreter for lowered modules
//! - [`ir`]: the instruction form and its verifier
//! - [`lower`]: IR lowering
//! - [`options`]: compilation options
//! - [`specialize`]: primitive specializer
//! - [`types`]: representation types and the type mapper

pub mod anf;
pub mod codegen;
pub mod context;
pub mod conversion;
pub mod fragment;
pub mod gensym;
pub mod interp;
pub mod ir;
pub mod lower;
pub mod options;
pub mod specialize;
pub mod types;

pub use anf::{AExp, AVal, LocalEnv, Normalizer};
pub use codegen::{CEmitter, generate};
pub use context::CompilationContext;
pub use conversion::{Conversion, ConversionKind, find_conversion};
pub use fragment::{BinOp, Fragment, UnOp};
pub use gensym::NameGen;
pub use interp::{EvalError, Interpreter, Value};
pub use ir::verify::{VerifyError, verify};
pub use ir::{CDef, CFunction, CLExp, CVal, CompiledModule, Instr, RETURN_PARAM};
pub use lower::{Lowered, Lowerer};
pub use options::{CompileOptions, EmitFlags};
pub use specialize::Specializer;
pub use types::{CTyp, TypeMapper};

pub use sable_core::CompilationError;

use sable_core::{Def, FunctionDef, Span, Typ, TypeOracle};
use tracing::{debug, warn};

/// Result of compilation.
pub struct CompilationResult {
    /// The definitions that compiled, in declaration order.
    pub module: CompiledModule,
    /// One error per definition that failed.
    pub errors: Vec<CompilationError>,
}

impl CompilationResult {
    /// Check if compilation succeeded (no errors).
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The main compiler entry point.
///
/// A failing definition is reported and left out of the module; the ones
/// after it still compile.
pub struct Compiler<'a> {
    oracle: &'a dyn TypeOracle,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        Self {
            oracle,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile definitions in declaration order.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, defs: &[Def]) -> CompilationResult {
        let mut names = NameGen::new();
        let mut ctx = CompilationContext::new();
        let mut module = CompiledModule::new();
        let mut errors = Vec::new();

        for def in defs {
            debug!(definition = def.name(), "compiling definition");
            match self.definition(def, &mut ctx, &mut names) {
                Ok(compiled) => module.defs.push(compiled),
                Err(err) => {
                    warn!(definition = def.name(), error = %err, "definition failed");
                    errors.push(err);
                }
            }
        }

        debug!(
            definitions = module.defs.len(),
            errors = errors.len(),
            fresh_names = names.count(),
            "compilation finished"
        );
        CompilationResult { module, errors }
    }

    /// Compile definitions and render the result as C.
    pub fn compile_to_c(&self, defs: &[Def]) -> Result<String, Vec<CompilationError>> {
        let result = self.compile(defs);
        if result.is_success() {
            Ok(generate(&result.module, self.options.emit))
        } else {
            Err(result.errors)
        }
    }

    fn definition(
        &self,
        def: &Def,
        ctx: &mut CompilationContext,
        names: &mut NameGen,
    ) -> Result<CDef, CompilationError> {
        match def {
            Def::Register { name, typ } => {
                let ctyp = TypeMapper::new(ctx, self.oracle).ctyp(typ, Span::UNKNOWN)?;
                Ok(CDef::Register(name.clone(), ctyp))
            }
            Def::Struct { name, fields } => {
                let fields = self.layout(ctx, fields)?;
                *ctx = std::mem::take(ctx).with_struct(name.clone(), fields);
                self.registered(ctx, name)
            }
            Def::Enum { name, members } => {
                *ctx = std::mem::take(ctx).with_enum(name.clone(), members.clone());
                self.registered(ctx, name)
            }
            Def::Union { name, ctors } => {
                let ctors = self.layout(ctx, ctors)?;
                *ctx = std::mem::take(ctx).with_variant(name.clone(), ctors);
                self.registered(ctx, name)
            }
            Def::Function(function) => self.function(function, ctx, names).map(CDef::Function),
        }
    }

    fn layout(
        &self,
        ctx: &CompilationContext,
        entries: &[(String, Typ)],
    ) -> Result<Vec<(String, CTyp)>, CompilationError> {
        let mapper = TypeMapper::new(ctx, self.oracle);
        entries
            .iter()
            .map(|(name, typ)| Ok((name.clone(), mapper.ctyp(typ, Span::UNKNOWN)?)))
            .collect()
    }

    fn registered(&self, ctx: &CompilationContext, name: &str) -> Result<CDef, CompilationError> {
        ctx.lookup(name)
            .map(CDef::Type)
            .ok_or_else(|| CompilationError::internal(format!("type '{name}' was not registered")))
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn function(
        &self,
        function: &FunctionDef,
        ctx: &CompilationContext,
        names: &mut NameGen,
    ) -> Result<CFunction, CompilationError> {
        let name = &function.name;
        let sig = self
            .oracle
            .signature(name)
            .ok_or_else(|| CompilationError::UnknownFunction { name: name.clone() })?;
        if sig.params.len() != function.params.len() {
            return Err(CompilationError::internal(format!(
                "'{name}' declares {} parameters but its signature has {}",
                function.params.len(),
                sig.params.len()
            )));
        }

        let mapper = TypeMapper::new(ctx, self.oracle);
        let params = function
            .params
            .iter()
            .zip(&sig.params)
            .map(|(param, typ)| Ok((param.clone(), mapper.ctyp(typ, function.span)?)))
            .collect::<Result<Vec<_>, CompilationError>>()?;
        let ret = mapper.ctyp(&sig.ret, function.span)?;

        let mut normalizer = Normalizer::new(self.oracle, names);
        for (param, typ) in function.params.iter().zip(&sig.params) {
            normalizer.declare_param(param, typ.clone());
        }
        let mut body = normalizer.normalize(&function.body)?;
        debug!(function = %name, "normalized");

        if self.options.specialize {
            body = Specializer::new(&mapper).specialize(body);
            debug!(function = %name, "specialized");
        }

        let lowered = Lowerer::new(ctx, self.oracle, names).function(name, params, ret, body)?;
        debug!(function = %name, instrs = lowered.body.len(), "lowered");

        if self.options.verify {
            verify(&lowered)
                .map_err(|err| CompilationError::internal(format!("in '{name}': {err}")))?;
        }
        Ok(lowered)
    }
}
