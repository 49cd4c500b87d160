//! Source locations carried by checked expressions.
//!
//! The backend never reads source text; spans only travel from the checked
//! tree into diagnostics so that a failing definition can be located.

use std::fmt;

/// A source position, as reported by the front end.
///
/// Nodes synthesised by the backend itself (fresh bindings, desugared
/// builtins) use [`Span::UNKNOWN`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed, 0 when unknown).
    pub line: u32,
    /// Column number (1-indexed, 0 when unknown).
    pub col: u32,
}

impl Span {
    /// Span used for nodes without a source position.
    pub const UNKNOWN: Span = Span { line: 0, col: 0 };

    /// Create a span at a line and column.
    #[inline]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Whether this span carries no position.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<generated>")
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}
