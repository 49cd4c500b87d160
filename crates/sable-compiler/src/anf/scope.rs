//! Lexical environment for normalization.
//!
//! `LocalEnv` tracks the locals visible at each point of a function body so
//! that identifier references can be classified. It handles:
//! - Parameters and `let` bindings (immutable locals)
//! - Scoped `var` bindings (mutable locals)
//! - Nested scopes, with shadowed bindings restored on scope exit
//!
//! Names that are not local are classified by the oracle.

use rustc_hash::FxHashMap;
use sable_core::{IdClass, Typ, TypeOracle};

/// A local binding.
#[derive(Debug, Clone)]
pub struct LocalVar {
    /// Declared type.
    pub typ: Typ,
    /// Whether the binding came from `var`.
    pub mutable: bool,
    /// Scope depth where declared.
    pub depth: u32,
}

/// Local bindings of the function being normalized.
#[derive(Debug, Default)]
pub struct LocalEnv {
    variables: FxHashMap<String, LocalVar>,

    /// Current scope depth (0 = function scope).
    depth: u32,

    /// Bindings hidden by a declaration, with the depth that hid them.
    shadowed: Vec<(u32, String, LocalVar)>,
}

impl LocalEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a nested scope.
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave the current scope, dropping its bindings and restoring any it hid.
    pub fn pop_scope(&mut self) {
        let depth = self.depth;
        self.variables.retain(|_, var| var.depth < depth);

        while let Some((shadowed_at, _, _)) = self.shadowed.last() {
            if *shadowed_at != depth {
                break;
            }
            if let Some((_, name, var)) = self.shadowed.pop()
                && var.depth < depth
            {
                self.variables.insert(name, var);
            }
        }

        self.depth = depth.saturating_sub(1);
    }

    /// Declare a binding in the current scope.
    pub fn declare(&mut self, name: impl Into<String>, typ: Typ, mutable: bool) {
        let name = name.into();
        let var = LocalVar {
            typ,
            mutable,
            depth: self.depth,
        };
        if let Some(old) = self.variables.insert(name.clone(), var) {
            self.shadowed.push((self.depth, name, old));
        }
    }

    /// Look up a local binding.
    pub fn get(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }

    /// Classify an identifier: locals first, then globals, else unresolved.
    pub fn classify(&self, name: &str, oracle: &dyn TypeOracle) -> Option<(IdClass, Typ)> {
        if let Some(var) = self.get(name) {
            let class = if var.mutable {
                IdClass::MutableLocal
            } else {
                IdClass::ImmutableLocal
            };
            return Some((class, var.typ.clone()));
        }
        oracle.global(name)
    }

    /// Current scope depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }
}
