//! Shared vocabulary for the sable backend.
//!
//! This crate holds everything the backend consumes from, or reports to, its
//! collaborators:
//!
//! - [`ast`]: the checked expression tree and top-level definitions
//! - [`types`]: resolved source types and symbolic sizes
//! - [`oracle`]: identifier classification, signatures and bound simplification
//! - [`error`]: the compilation error taxonomy
//! - [`span`]: source positions

pub mod ast;
pub mod error;
pub mod oracle;
pub mod span;
pub mod types;

pub use ast::{Def, Exp, ExpKind, FunctionDef, LExp, Lit, LoopKind, Pat};
pub use error::CompilationError;
pub use oracle::{IdClass, Signature, StaticOracle, TypeOracle};
pub use span::Span;
pub use types::{NExp, Order, Typ};
