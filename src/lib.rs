//! Sable: a C backend for an ISA description language.
//!
//! The front end (parsing, name resolution, type checking) lives upstream.
//! It hands over checked definitions ([`Def`]) and answers questions about
//! globals and signatures through a [`TypeOracle`]. This crate turns those
//! into one C translation unit.
//!
//! ```ignore
//! use sable::prelude::*;
//!
//! let mut oracle = StaticOracle::new();
//! oracle.register("PC", Typ::bits(64));
//! let c = sable::compile_to_c(&oracle, &defs, CompileOptions::default())?;
//! ```

pub use sable_compiler as compiler;
pub use sable_core as core;

use sable_compiler::{CompilationResult, CompileOptions, Compiler};
use sable_core::{CompilationError, Def, TypeOracle};
use thiserror::Error;
use tracing::debug;

// Re-export main types
pub mod prelude {
    pub use sable_compiler::{
        CDef, CFunction, CTyp, CompilationResult, CompileOptions, CompiledModule, Compiler,
        EmitFlags, EvalError, Instr, Interpreter, Value,
    };
    pub use sable_core::{
        CompilationError, Def, Exp, ExpKind, FunctionDef, IdClass, LExp, Lit, LoopKind, NExp,
        Order, Pat, Signature, Span, StaticOracle, Typ, TypeOracle,
    };

    pub use crate::{SableError, SableResult};
}

/// Failure of a whole compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SableError {
    #[error("{} definition(s) failed to compile; first: {}", .0.len(), first(.0))]
    Compilation(Vec<CompilationError>),
}

fn first(errors: &[CompilationError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

pub type SableResult<T> = Result<T, SableError>;

/// Compile definitions into lowered form.
pub fn compile(oracle: &dyn TypeOracle, defs: &[Def], options: CompileOptions) -> CompilationResult {
    Compiler::new(oracle).with_options(options).compile(defs)
}

/// Compile definitions to C source text.
///
/// Fails if any definition fails, reporting all of them.
pub fn compile_to_c(
    oracle: &dyn TypeOracle,
    defs: &[Def],
    options: CompileOptions,
) -> SableResult<String> {
    let source = Compiler::new(oracle)
        .with_options(options)
        .compile_to_c(defs)
        .map_err(SableError::Compilation)?;
    debug!(bytes = source.len(), "generated C");
    Ok(source)
}
