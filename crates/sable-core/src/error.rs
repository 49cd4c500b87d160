//! Error types for the backend.
//!
//! ## Error Taxonomy
//!
//! ```text
//! CompilationError
//! ├── UnrepresentableType     - a source type has no compiled representation
//! ├── UnsupportedConstruct    - a form upstream passes should have removed
//! ├── RepresentationMismatch  - lowering cannot bridge two representations
//! └── Unknown* / Internal     - oracle lookups that failed, broken invariants
//! ```
//!
//! Every variant is fatal for the definition being compiled and for nothing
//! else: the driver collects one error per failing definition and carries on
//! with the next one.

use thiserror::Error;

use crate::Span;

/// Errors raised while compiling a single top-level definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// A source type has no compiled representation.
    #[error("at {span}: type '{typ}' cannot be represented")]
    UnrepresentableType {
        /// Rendering of the offending type.
        typ: String,
        /// Where the type was used.
        span: Span,
    },

    /// A source form reached the backend that should have been rewritten upstream.
    #[error("at {span}: unsupported construct: {construct}")]
    UnsupportedConstruct {
        /// Description of the construct.
        construct: String,
        /// Where it occurred.
        span: Span,
    },

    /// Two representations could not be bridged.
    #[error("cannot convert {from} to {to} in {context}")]
    RepresentationMismatch {
        /// Representation of the value.
        from: String,
        /// Representation required.
        to: String,
        /// What was being lowered (argument, assignment, return, ...).
        context: String,
    },

    /// A called function has no known signature.
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// The function name.
        name: String,
    },

    /// A record has no field of this name.
    #[error("type '{record}' has no field '{field}'")]
    UnknownField {
        /// The record type.
        record: String,
        /// The field name.
        field: String,
    },

    /// Assignment to something that is not a mutable local or register.
    #[error("at {span}: cannot assign to '{target}'")]
    InvalidAssignment {
        /// The assignment target.
        target: String,
        /// Where the assignment occurred.
        span: Span,
    },

    /// Address-of applied to something that is not a register.
    #[error("at {span}: cannot take a reference to '{name}'")]
    InvalidReference {
        /// The referenced name.
        name: String,
        /// Where the reference occurred.
        span: Span,
    },

    /// `return` outside of a function body.
    #[error("return outside of a function body")]
    ReturnOutsideFunction,

    /// A backend invariant did not hold.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

impl CompilationError {
    /// Shorthand for [`CompilationError::UnsupportedConstruct`].
    pub fn unsupported(construct: impl Into<String>, span: Span) -> Self {
        CompilationError::UnsupportedConstruct {
            construct: construct.into(),
            span,
        }
    }

    /// Shorthand for [`CompilationError::RepresentationMismatch`].
    pub fn mismatch(
        from: impl ToString,
        to: impl ToString,
        context: impl Into<String>,
    ) -> Self {
        CompilationError::RepresentationMismatch {
            from: from.to_string(),
            to: to.to_string(),
            context: context.into(),
        }
    }

    /// Shorthand for [`CompilationError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}
